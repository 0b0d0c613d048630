/// Process local memory, used when no vector database is configured.
pub mod inmemory;

#[cfg(feature = "qdrant")]
pub mod qdrant;
