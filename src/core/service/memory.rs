use crate::{
    core::{
        handler::{
            SaveRecordsHandler, SwaggerPartitioningHandler, TextExtractionHandler, SWAGGER_STEPS,
        },
        memory::{group_citations, SearchResult},
        model::{add_tag, API_TOKEN_TAG, SWAGGER_FILE_TAG},
        pipeline::{DataPipeline, PipelineOrchestrator, StepContext, UploadFile},
        provider::ProviderState,
    },
    err,
    error::{DocAssistErr, DocAssistError},
    map_err,
};
use dto::{DocumentImport, SwaggerUpload};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validify::{Validate, Validify};

/// High level operations on imported documents and the memory they are stored in.
#[derive(Clone)]
pub struct MemoryService {
    providers: ProviderState,
    orchestrator: PipelineOrchestrator,

    /// The index documents get imported to.
    index: String,
}

impl MemoryService {
    pub fn new(providers: ProviderState, index: &str) -> Self {
        let orchestrator = PipelineOrchestrator::new(providers.store.clone())
            .with_handler(Arc::new(TextExtractionHandler::new(providers.store.clone())))
            .with_handler(Arc::new(SwaggerPartitioningHandler::new(
                providers.store.clone(),
                providers.embedder.clone(),
            )))
            .with_handler(Arc::new(SaveRecordsHandler::new(
                providers.store.clone(),
                providers.embedder.clone(),
                providers.memory.clone(),
            )));

        Self {
            providers,
            orchestrator,
            index: index.to_string(),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Import an API description, tagging every partition with the file name
    /// and the API key used to call the API.
    ///
    /// * `upload`: The file and its API key.
    /// * `ctx`: Cancellation and progress.
    pub async fn upload_swagger(
        &self,
        mut upload: SwaggerUpload<'_>,
        ctx: &StepContext,
    ) -> Result<DataPipeline, DocAssistError> {
        map_err!(upload.validify());

        let mut import = DocumentImport {
            document_id: None,
            tags: Default::default(),
            files: vec![UploadFile {
                name: upload.file_name.clone(),
                content: upload.content.to_vec(),
            }],
        };

        add_tag(&mut import.tags, SWAGGER_FILE_TAG, upload.file_name);

        if let Some(api_key) = upload.api_key.filter(|key| !key.trim().is_empty()) {
            add_tag(&mut import.tags, API_TOKEN_TAG, api_key);
        }

        self.import_document(import, ctx).await
    }

    /// Import a document by running its files through the extract, partition and
    /// save records steps. Importing an existing document ID replaces the document.
    ///
    /// * `import`: Document files and tags.
    /// * `ctx`: Cancellation and progress.
    pub async fn import_document(
        &self,
        import: DocumentImport,
        ctx: &StepContext,
    ) -> Result<DataPipeline, DocAssistError> {
        map_err!(import.validate());

        let document_id = match import.document_id {
            Some(id) => {
                validate_document_id(&id)?;
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        if self.pipeline_status(&document_id).await.is_ok() {
            info!("Document '{document_id}' exists, replacing");
            self.delete_document(&document_id).await?;
        }

        let mut pipeline = SWAGGER_STEPS.iter().fold(
            DataPipeline::new(&self.index, &document_id, import.tags),
            |pipeline, step| pipeline.then(step),
        );

        self.orchestrator
            .upload_files(&mut pipeline, import.files)
            .await?;

        self.orchestrator.run(&mut pipeline, ctx).await?;

        Ok(pipeline)
    }

    /// Read the ingestion state of a document.
    ///
    /// * `document_id`: Document ID.
    pub async fn pipeline_status(&self, document_id: &str) -> Result<DataPipeline, DocAssistError> {
        validate_document_id(document_id)?;
        self.orchestrator.read_status(&self.index, document_id).await
    }

    /// Delete a document's records and artifacts.
    ///
    /// * `document_id`: Document ID.
    pub async fn delete_document(&self, document_id: &str) -> Result<(), DocAssistError> {
        validate_document_id(document_id)?;

        if let Err(e) = self.pipeline_status(document_id).await {
            return match e.error {
                DocAssistErr::DoesNotExist(_) => err!(DoesNotExist, "Document '{document_id}'"),
                _ => Err(e),
            };
        }

        if self.has_index(&self.index).await? {
            self.providers
                .memory
                .delete_document(&self.index, document_id)
                .await?;
        }

        self.providers
            .store
            .delete_document(&self.index, document_id)
            .await?;

        info!("Deleted document '{document_id}' from '{}'", self.index);

        Ok(())
    }

    /// Delete every index in the memory along with all stored artifacts.
    pub async fn remove_memory(&self) -> Result<(), DocAssistError> {
        let mut indexes = self.providers.memory.list_indexes().await?;

        for index in indexes.iter() {
            self.providers.memory.delete_index(index).await?;
            debug!("Deleted index '{index}'");
        }

        if !indexes.contains(&self.index) {
            indexes.push(self.index.clone());
        }

        for index in indexes.iter() {
            self.providers.store.delete_index(index).await?;
        }

        info!("Removed memory ({} indexes)", indexes.len());

        Ok(())
    }

    /// Query the memory for partitions relevant to `query`, grouped by source file.
    ///
    /// * `query`: Text to search by.
    /// * `limit`: Maximum amount of partitions.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResult, DocAssistError> {
        if !self.has_index(&self.index).await? {
            debug!("Index '{}' does not exist, nothing to search", self.index);
            return Ok(group_citations(&self.index, query, vec![]));
        }

        let mut vectors = self.providers.embedder.embed(&[query]).await?;

        let Some(vector) = vectors.pop() else {
            return err!(Llm, "no embedding returned for query");
        };

        let records = self
            .providers
            .memory
            .search(&self.index, &vector, limit)
            .await?;

        debug!("Found {} records for '{query}'", records.len());

        Ok(group_citations(&self.index, query, records))
    }

    async fn has_index(&self, index: &str) -> Result<bool, DocAssistError> {
        let indexes = self.providers.memory.list_indexes().await?;
        Ok(indexes.iter().any(|i| i == index))
    }
}

/// Document IDs end up as directory names in the artifact store.
fn validate_document_id(id: &str) -> Result<(), DocAssistError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !valid {
        return err!(InvalidDocumentId, "'{id}'");
    }

    Ok(())
}

/// Memory service DTOs.
pub mod dto {
    use crate::core::{model::TagCollection, pipeline::UploadFile};
    use validify::{Validate, Validify};

    #[derive(Debug, Validify)]
    pub struct SwaggerUpload<'a> {
        /// Name of the uploaded file.
        #[modify(trim)]
        #[validate(length(min = 1, message = "File name cannot be empty."))]
        pub file_name: String,

        /// File contents.
        pub content: &'a [u8],

        /// Key used when calling the described API.
        pub api_key: Option<String>,
    }

    #[derive(Debug, Validate)]
    pub struct DocumentImport {
        /// Generated if not given.
        pub document_id: Option<String>,

        /// Tags inherited by every partition.
        pub tags: TagCollection,

        #[validate(length(min = 1, message = "At least one file is required."))]
        pub files: Vec<UploadFile>,
    }
}
