use super::memory::MemoryService;
use crate::{
    config::{DEFAULT_SEARCH_LIMIT, MERGE_PARTITION_LIMIT},
    core::swagger::{merge, PartitionRecord},
    err,
    error::DocAssistError,
};
use dto::SwaggerDocument;
use tracing::debug;

/// Assembles the document relevant to a question from the partitions in the memory.
#[derive(Clone)]
pub struct SearchService {
    memory: MemoryService,
}

impl SearchService {
    pub fn new(memory: MemoryService) -> Self {
        Self { memory }
    }

    /// Find the file most relevant to `prompt` and merge its top ranked partitions
    /// into a single document.
    ///
    /// Errors with `NoResults` if nothing relevant is stored.
    ///
    /// * `prompt`: The user's question.
    pub async fn search_document(&self, prompt: &str) -> Result<SwaggerDocument, DocAssistError> {
        let result = self.memory.search(prompt, DEFAULT_SEARCH_LIMIT).await?;

        let Some(citation) = result.results.first() else {
            return err!(NoResults, "no API documentation relevant to '{prompt}'");
        };

        let records = citation
            .partitions
            .iter()
            .take(MERGE_PARTITION_LIMIT)
            .map(|partition| PartitionRecord {
                text: partition.text.clone(),
                tags: partition.tags.clone(),
            })
            .collect::<Vec<_>>();

        let merged = merge(&records)?;

        debug!(
            "Merged {:?} from '{}' for '{prompt}'",
            merged.endpoints, citation.source_name
        );

        Ok(SwaggerDocument {
            swagger_file: citation.source_name.clone(),
            swagger_content: merged.document,
            endpoints: merged.endpoints,
            api_key: merged.api_key,
        })
    }
}

/// Search service DTOs.
pub mod dto {
    use serde::Serialize;
    use utoipa::ToSchema;

    /// A document assembled from retrieved partitions.
    #[derive(Debug, Clone, Serialize, ToSchema)]
    #[serde(rename_all = "camelCase")]
    pub struct SwaggerDocument {
        /// Name of the file the partitions come from.
        pub swagger_file: String,

        /// The merged Swagger 2.0 document.
        pub swagger_content: String,

        /// Path keys in the merged document.
        pub endpoints: Vec<String>,

        /// Key used when calling the described API.
        #[serde(skip)]
        pub api_key: Option<String>,
    }
}
