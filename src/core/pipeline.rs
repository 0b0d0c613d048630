//! Document ingestion pipelines.
//!
//! An imported document is a set of uploaded files that goes through a sequence of
//! named steps. Each step is a [PipelineStepHandler] that reads the files' artifacts
//! from the [ArtifactStore][crate::core::store::ArtifactStore], generates new ones and records what it did in the
//! [DataPipeline]. The pipeline is persisted after every step.

use crate::{
    core::{
        model::{sha256, TagCollection},
        provider::DynArtifactStore,
        store::PIPELINE_STATUS_FILE,
    },
    err,
    error::DocAssistError,
    map_err,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, sync::Arc};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::swagger::Progress;

const MIME_JSON: &str = "application/json";
const MIME_YAML: &str = "application/x-yaml";
pub const MIME_TEXT: &str = "text/plain";
const MIME_MARKDOWN: &str = "text/markdown";
const MIME_UNKNOWN: &str = "application/octet-stream";

/// Guess the MIME type of a file from its extension.
pub fn mime_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => MIME_JSON,
        Some("yaml" | "yml") => MIME_YAML,
        Some("txt") => MIME_TEXT,
        Some("md") => MIME_MARKDOWN,
        _ => MIME_UNKNOWN,
    }
}

/// Whether the MIME type denotes content the pipeline can read as text.
pub fn is_text(mime_type: &str) -> bool {
    matches!(mime_type, MIME_JSON | MIME_YAML | MIME_TEXT | MIME_MARKDOWN)
}

/// The state of a document's ingestion. Persisted as `__pipeline_status.json`
/// next to the document's artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataPipeline {
    /// Memory index the document gets stored in.
    pub index: String,

    pub document_id: String,

    /// Unique ID of this run.
    pub execution_id: String,

    /// Tags inherited by every artifact and record of the document.
    pub tags: TagCollection,

    /// All the steps, in order of execution.
    pub steps: Vec<String>,

    pub remaining_steps: Vec<String>,

    pub completed_steps: Vec<String>,

    pub creation: DateTime<Utc>,

    pub last_update: DateTime<Utc>,

    /// The uploaded files.
    pub files: Vec<FileDetails>,
}

impl DataPipeline {
    pub fn new(index: &str, document_id: &str, tags: TagCollection) -> Self {
        let now = Utc::now();
        Self {
            index: index.to_string(),
            document_id: document_id.to_string(),
            execution_id: Uuid::new_v4().to_string(),
            tags,
            steps: vec![],
            remaining_steps: vec![],
            completed_steps: vec![],
            creation: now,
            last_update: now,
            files: vec![],
        }
    }

    /// Append a step to the pipeline.
    ///
    /// * `step`: Name of the step handler.
    pub fn then(mut self, step: &str) -> Self {
        self.steps.push(step.to_string());
        self.remaining_steps.push(step.to_string());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_steps.is_empty()
    }

    fn move_to_next_step(&mut self) {
        if !self.remaining_steps.is_empty() {
            let step = self.remaining_steps.remove(0);
            self.completed_steps.push(step);
        }
        self.last_update = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineLogEntry {
    pub time: DateTime<Utc>,

    /// The step that wrote the entry.
    pub source: String,

    pub text: String,
}

/// Details of an uploaded file and everything generated from it.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    pub id: String,

    /// Name of the file in the artifact store.
    pub name: String,

    pub size: usize,

    pub mime_type: String,

    pub tags: TagCollection,

    /// Steps that are done with this file.
    pub processed_by: Vec<String>,

    /// Diagnostics attached by the steps.
    pub log: Vec<PipelineLogEntry>,

    /// Artifacts generated from this file, keyed by name.
    pub generated_files: BTreeMap<String, GeneratedFileDetails>,
}

impl FileDetails {
    pub fn already_processed_by(&self, step: &str) -> bool {
        self.processed_by.iter().any(|s| s == step)
    }

    pub fn mark_processed_by(&mut self, step: &str) {
        if !self.already_processed_by(step) {
            self.processed_by.push(step.to_string());
        }
    }

    pub fn log(&mut self, source: &str, text: impl Into<String>) {
        self.log.push(PipelineLogEntry {
            time: Utc::now(),
            source: source.to_string(),
            text: text.into(),
        });
    }

    /// Generated artifacts of the given type, in name order.
    pub fn artifacts(&self, artifact_type: ArtifactType) -> Vec<GeneratedFileDetails> {
        self.generated_files
            .values()
            .filter(|file| file.artifact_type == artifact_type)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactType {
    ExtractedText,
    TextPartition,
}

/// An artifact generated by a step.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFileDetails {
    pub id: String,

    /// ID of the uploaded file the artifact is generated from.
    pub parent_id: String,

    pub name: String,

    pub size: usize,

    pub mime_type: String,

    pub artifact_type: ArtifactType,

    /// Index of the partition within its file. Only set on partitions.
    pub partition_number: Option<usize>,

    pub tags: TagCollection,

    /// Hex encoded SHA-256 of the content.
    pub content_sha256: String,

    pub processed_by: Vec<String>,
}

impl GeneratedFileDetails {
    /// Describe `content` as an artifact of `parent`.
    pub fn new(
        parent: &FileDetails,
        name: String,
        mime_type: &str,
        artifact_type: ArtifactType,
        content: &[u8],
        tags: TagCollection,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: parent.id.clone(),
            name,
            size: content.len(),
            mime_type: mime_type.to_string(),
            artifact_type,
            partition_number: None,
            tags,
            content_sha256: sha256(content),
            processed_by: vec![],
        }
    }

    pub fn with_partition_number(mut self, n: usize) -> Self {
        self.partition_number = Some(n);
        self
    }
}

/// A file to import.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// Progress of a single step, reported by steps that can tell how far along they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    pub step: &'static str,
    pub current: usize,
    pub total: usize,
}

pub type ProgressSink = Arc<dyn Fn(StepProgress) + Send + Sync>;

/// What a step gets besides the pipeline.
#[derive(Clone)]
pub struct StepContext {
    cancel: watch::Receiver<bool>,
    progress: ProgressSink,
}

impl StepContext {
    /// * `cancel`: Set to `true` to stop the pipeline.
    /// * `progress`: Called with the progress of long running steps.
    pub fn new(cancel: watch::Receiver<bool>, progress: ProgressSink) -> Self {
        Self { cancel, progress }
    }

    /// A context that is never cancelled and discards progress.
    pub fn detached() -> Self {
        let (_, cancel) = watch::channel(false);
        Self {
            cancel,
            progress: Arc::new(|_| {}),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Errors with `Cancelled` if the pipeline was cancelled.
    pub fn check_cancelled(&self, step: &str) -> Result<(), DocAssistError> {
        if self.is_cancelled() {
            return err!(Cancelled, "pipeline cancelled during '{step}'");
        }
        Ok(())
    }

    pub fn report(&self, step: &'static str, progress: Progress) {
        (self.progress)(StepProgress {
            step,
            current: progress.current,
            total: progress.total,
        })
    }
}

/// A pipeline step.
#[async_trait::async_trait]
pub trait PipelineStepHandler {
    /// The name pipelines refer to the step by.
    fn step_name(&self) -> &'static str;

    /// Process the pipeline's files. Files the step already processed must be skipped.
    ///
    /// * `pipeline`: The pipeline to process.
    /// * `ctx`: Cancellation and progress.
    async fn invoke(
        &self,
        pipeline: &mut DataPipeline,
        ctx: &StepContext,
    ) -> Result<(), DocAssistError>;
}

pub type DynStepHandler = Arc<dyn PipelineStepHandler + Send + Sync>;

/// Runs pipelines through their steps.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    store: DynArtifactStore,
    handlers: Vec<DynStepHandler>,
}

impl PipelineOrchestrator {
    pub fn new(store: DynArtifactStore) -> Self {
        Self {
            store,
            handlers: vec![],
        }
    }

    /// Register a step handler, replacing any handler with the same step name.
    pub fn with_handler(mut self, handler: DynStepHandler) -> Self {
        self.handlers
            .retain(|h| h.step_name() != handler.step_name());
        self.handlers.push(handler);
        self
    }

    /// Names of the registered steps, in registration order.
    pub fn steps(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.step_name()).collect()
    }

    /// Write the files to the store and add them to the pipeline.
    ///
    /// * `pipeline`: The pipeline the files belong to.
    /// * `files`: The uploaded files.
    pub async fn upload_files(
        &self,
        pipeline: &mut DataPipeline,
        files: Vec<UploadFile>,
    ) -> Result<(), DocAssistError> {
        for file in files {
            validate_file_name(&file.name)?;

            if pipeline.files.iter().any(|f| f.name == file.name) {
                return err!(InvalidFileName, "'{}' uploaded more than once", file.name);
            }

            self.store
                .write(
                    &pipeline.index,
                    &pipeline.document_id,
                    &file.name,
                    &file.content,
                )
                .await?;

            debug!(
                "Uploaded '{}' ({} bytes) to '{}/{}'",
                file.name,
                file.content.len(),
                pipeline.index,
                pipeline.document_id
            );

            pipeline.files.push(FileDetails {
                id: Uuid::new_v4().to_string(),
                mime_type: mime_type(&file.name).to_string(),
                size: file.content.len(),
                name: file.name,
                tags: pipeline.tags.clone(),
                processed_by: vec![],
                log: vec![],
                generated_files: BTreeMap::new(),
            });
        }

        Ok(())
    }

    /// Run the pipeline's remaining steps, persisting its state after each one.
    ///
    /// * `pipeline`: The pipeline to run.
    /// * `ctx`: Cancellation and progress.
    pub async fn run(
        &self,
        pipeline: &mut DataPipeline,
        ctx: &StepContext,
    ) -> Result<(), DocAssistError> {
        info!(
            "Running pipeline '{}' for document '{}' in '{}'",
            pipeline.execution_id, pipeline.document_id, pipeline.index
        );

        self.save_status(pipeline).await?;

        while let Some(step) = pipeline.remaining_steps.first().cloned() {
            ctx.check_cancelled(&step)?;

            let Some(handler) = self.handlers.iter().find(|h| h.step_name() == step) else {
                return err!(DoesNotExist, "handler for step '{step}'");
            };

            debug!("Step '{step}' started");

            handler.invoke(pipeline, ctx).await?;

            pipeline.move_to_next_step();

            self.save_status(pipeline).await?;

            debug!("Step '{step}' completed");
        }

        info!(
            "Pipeline '{}' for document '{}' completed",
            pipeline.execution_id, pipeline.document_id
        );

        Ok(())
    }

    /// Read the persisted state of a document's pipeline.
    ///
    /// * `index`: Memory index.
    /// * `document_id`: Document ID.
    pub async fn read_status(
        &self,
        index: &str,
        document_id: &str,
    ) -> Result<DataPipeline, DocAssistError> {
        let status = self
            .store
            .read(index, document_id, PIPELINE_STATUS_FILE)
            .await?;
        Ok(map_err!(serde_json::from_slice(&status)))
    }

    async fn save_status(&self, pipeline: &DataPipeline) -> Result<(), DocAssistError> {
        let status = map_err!(serde_json::to_vec_pretty(pipeline));
        self.store
            .write(
                &pipeline.index,
                &pipeline.document_id,
                PIPELINE_STATUS_FILE,
                &status,
            )
            .await
    }
}

/// File names end up as paths in the artifact store.
pub fn validate_file_name(name: &str) -> Result<(), DocAssistError> {
    if name.is_empty()
        || name == PIPELINE_STATUS_FILE
        || name.starts_with('.')
        || name.contains(['/', '\\'])
    {
        return err!(InvalidFileName, "'{name}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types_from_extensions() {
        assert_eq!(MIME_JSON, mime_type("petstore.json"));
        assert_eq!(MIME_YAML, mime_type("petstore.YAML"));
        assert_eq!(MIME_YAML, mime_type("petstore.yml"));
        assert_eq!(MIME_TEXT, mime_type("notes.txt"));
        assert_eq!(MIME_MARKDOWN, mime_type("README.md"));
        assert_eq!(MIME_UNKNOWN, mime_type("manual.pdf"));
        assert_eq!(MIME_UNKNOWN, mime_type("petstore"));
        assert!(is_text(mime_type("petstore.json")));
        assert!(!is_text(mime_type("manual.pdf")));
    }

    #[test]
    fn steps_move_in_order() {
        let mut pipeline = DataPipeline::new("default", "doc", TagCollection::new())
            .then("extract")
            .then("partition");

        assert!(!pipeline.is_complete());

        pipeline.move_to_next_step();
        assert_eq!(vec!["extract"], pipeline.completed_steps);
        assert_eq!(vec!["partition"], pipeline.remaining_steps);

        pipeline.move_to_next_step();
        assert!(pipeline.is_complete());
        assert_eq!(pipeline.steps, pipeline.completed_steps);
    }

    #[test]
    fn invalid_file_names() {
        for name in ["", "../etc/passwd", "a/b.json", ".hidden", PIPELINE_STATUS_FILE] {
            assert!(validate_file_name(name).is_err(), "accepted {name:?}");
        }
        assert!(validate_file_name("petstore.json").is_ok());
    }

    #[test]
    fn detached_context_is_never_cancelled() {
        let ctx = StepContext::detached();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check_cancelled("extract").is_ok());
    }
}
