use crate::error::DocAssistError;

/// Name of the artifact holding a document's serialized [DataPipeline][crate::core::pipeline::DataPipeline].
pub const PIPELINE_STATUS_FILE: &str = "__pipeline_status.json";

/// Stores uploaded files and the artifacts generated from them.
/// Artifacts are grouped by index and by the document they belong to.
#[async_trait::async_trait]
pub trait ArtifactStore {
    fn id(&self) -> &'static str;

    /// Write `content` to the artifact `name`, overwriting it if it exists.
    ///
    /// * `index`: Memory index the document belongs to.
    /// * `document_id`: Document ID.
    /// * `name`: Artifact name.
    /// * `content`: What to write.
    async fn write(
        &self,
        index: &str,
        document_id: &str,
        name: &str,
        content: &[u8],
    ) -> Result<(), DocAssistError>;

    /// Read the contents of the artifact `name`.
    /// Errors with `DoesNotExist` if the artifact is missing.
    ///
    /// * `index`: Memory index the document belongs to.
    /// * `document_id`: Document ID.
    /// * `name`: Artifact name.
    async fn read(
        &self,
        index: &str,
        document_id: &str,
        name: &str,
    ) -> Result<Vec<u8>, DocAssistError>;

    /// Delete every artifact of the document. Deleting a missing document is a no-op.
    ///
    /// * `index`: Memory index the document belongs to.
    /// * `document_id`: Document ID.
    async fn delete_document(&self, index: &str, document_id: &str)
        -> Result<(), DocAssistError>;

    /// Delete every document in the index.
    ///
    /// * `index`: Memory index to clear.
    async fn delete_index(&self, index: &str) -> Result<(), DocAssistError>;
}
