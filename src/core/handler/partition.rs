use super::PARTITION_STEP;
use crate::{
    core::{
        model::{add_tag, TagCollection, ENDPOINT_TAG},
        pipeline::{
            ArtifactType, DataPipeline, FileDetails, GeneratedFileDetails, PipelineStepHandler,
            StepContext, MIME_TEXT,
        },
        provider::{DynArtifactStore, DynEmbedder},
        swagger,
    },
    error::{DocAssistErr, DocAssistError},
    map_err,
};
use tracing::{debug, error, info, warn};

/// What happened to a file during partitioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// The file was split into this many partitions.
    Partitioned(usize),

    /// The file cannot be partitioned.
    Skipped(String),
}

/// Splits extracted API descriptions into one `{name}.extract.partition-{n}.txt`
/// artifact per path key.
///
/// A file that cannot be partitioned never fails the pipeline. It is skipped with a note
/// in its log and the remaining files are processed as usual.
#[derive(Clone)]
pub struct SwaggerPartitioningHandler {
    store: DynArtifactStore,
    embedder: DynEmbedder,
}

impl SwaggerPartitioningHandler {
    /// * `store`: Artifact storage.
    /// * `embedder`: Used for token counts of the partitions.
    pub fn new(store: DynArtifactStore, embedder: DynEmbedder) -> Self {
        Self { store, embedder }
    }

    /// Partition the extracted text of a single file. The file's generated files
    /// are only updated once all of the partitions are written.
    async fn partition_file(
        &self,
        index: &str,
        document_id: &str,
        tags: &TagCollection,
        file: &mut FileDetails,
        ctx: &StepContext,
    ) -> Result<PartitionOutcome, DocAssistError> {
        let sources = file.artifacts(ArtifactType::ExtractedText);

        let Some(source) = sources.first() else {
            return Ok(PartitionOutcome::Skipped("no extracted text".to_string()));
        };

        if source.mime_type != MIME_TEXT {
            return Ok(PartitionOutcome::Skipped(
                DocAssistErr::UnsupportedContentType(source.mime_type.clone()).to_string(),
            ));
        }

        let content = self.store.read(index, document_id, &source.name).await?;
        let text = map_err!(String::from_utf8(content));

        if text.trim().is_empty() {
            return Ok(PartitionOutcome::Skipped("empty document".to_string()));
        }

        let partitions = match swagger::split(&text, |p| ctx.report(PARTITION_STEP, p)) {
            Ok(partitions) => partitions,
            Err(DocAssistError {
                error: DocAssistErr::MalformedDocument(reason),
                ..
            }) => {
                return Ok(PartitionOutcome::Skipped(format!(
                    "not an API description; {reason}"
                )))
            }
            Err(e) => return Err(e),
        };

        let max_tokens = self.embedder.max_tokens();
        let mut generated = vec![];

        for (i, partition) in partitions.enumerate() {
            ctx.check_cancelled(PARTITION_STEP)?;

            let partition = partition?;
            let name = format!("{}.extract.partition-{i}.txt", file.name);

            let tokens = self.embedder.count_tokens(&partition.text);
            if tokens > max_tokens {
                warn!(
                    "Partition '{name}' ({}) has {tokens} tokens, embedder accepts {max_tokens}",
                    partition.endpoint
                );
            }

            debug!(
                "Writing partition '{name}' for '{}' ({tokens} tokens)",
                partition.endpoint
            );

            self.store
                .write(index, document_id, &name, partition.text.as_bytes())
                .await?;

            let mut partition_tags = tags.clone();
            add_tag(&mut partition_tags, ENDPOINT_TAG, partition.endpoint);

            let mut artifact = GeneratedFileDetails::new(
                file,
                name,
                MIME_TEXT,
                ArtifactType::TextPartition,
                partition.text.as_bytes(),
                partition_tags,
            )
            .with_partition_number(i);
            artifact.processed_by.push(PARTITION_STEP.to_string());

            generated.push(artifact);
        }

        let amount = generated.len();

        for artifact in generated {
            file.generated_files.insert(artifact.name.clone(), artifact);
        }

        Ok(PartitionOutcome::Partitioned(amount))
    }
}

#[async_trait::async_trait]
impl PipelineStepHandler for SwaggerPartitioningHandler {
    fn step_name(&self) -> &'static str {
        PARTITION_STEP
    }

    async fn invoke(
        &self,
        pipeline: &mut DataPipeline,
        ctx: &StepContext,
    ) -> Result<(), DocAssistError> {
        let DataPipeline {
            index,
            document_id,
            tags,
            files,
            ..
        } = pipeline;
        let (index, document_id, tags) = (index.as_str(), document_id.as_str(), &*tags);

        for file in files.iter_mut() {
            ctx.check_cancelled(PARTITION_STEP)?;

            if file.already_processed_by(PARTITION_STEP) {
                debug!("'{}' already partitioned, skipping", file.name);
                continue;
            }

            match self
                .partition_file(index, document_id, tags, file, ctx)
                .await
            {
                Ok(PartitionOutcome::Partitioned(amount)) => {
                    info!("Split '{}' into {amount} partitions", file.name);
                }
                Ok(PartitionOutcome::Skipped(reason)) => {
                    warn!("Skipping '{}'; {reason}", file.name);
                    file.log(PARTITION_STEP, reason);
                }
                Err(e @ DocAssistError {
                    error: DocAssistErr::Cancelled(_),
                    ..
                }) => return Err(e),
                Err(e) => {
                    e.print();
                    error!("Failed to partition '{}'", file.name);
                    file.log(PARTITION_STEP, format!("partitioning failed; {e}"));
                    continue;
                }
            }

            file.mark_processed_by(PARTITION_STEP);
        }

        Ok(())
    }
}
