use super::{
    embedder::Embedder,
    llm::{ChatCompletion, HttpRequestExecutor},
    memory::MemoryDb,
    store::ArtifactStore,
};
use std::sync::Arc;

pub type DynArtifactStore = Arc<dyn ArtifactStore + Send + Sync>;
pub type DynMemoryDb = Arc<dyn MemoryDb + Send + Sync>;
pub type DynEmbedder = Arc<dyn Embedder + Send + Sync>;
pub type DynChatCompletion = Arc<dyn ChatCompletion + Send + Sync>;
pub type DynRequestExecutor = Arc<dyn HttpRequestExecutor + Send + Sync>;

/// Holds the concrete implementations of the external collaborators.
/// Decouples the services from the implementations selected at startup.
#[derive(Clone)]
pub struct ProviderState {
    /// Uploaded files and generated artifacts.
    pub store: DynArtifactStore,

    /// Similarity index for partitions.
    pub memory: DynMemoryDb,

    pub embedder: DynEmbedder,

    pub chat: DynChatCompletion,

    /// Executes generated API requests.
    pub executor: DynRequestExecutor,
}
