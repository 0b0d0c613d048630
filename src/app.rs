//! Module containing concrete implementations from the [core](crate::core) module.

/// Artifact storage implementations.
pub mod document;

/// Text embedder implementations.
pub mod embedder;

/// Chat completion and request execution implementations.
pub mod llm;

/// Memory database implementations.
pub mod memory;

/// Index status tracking.
pub mod status;

/// Application state configuration.
pub mod state;

/// HTTP server implementation.
pub mod server;

#[cfg(test)]
pub mod test;
