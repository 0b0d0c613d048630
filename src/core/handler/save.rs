use super::SAVE_RECORDS_STEP;
use crate::{
    core::{
        memory::MemoryRecord,
        model::{
            add_tag, DOCUMENT_ID_TAG, FILE_ID_TAG, FILE_PART_TAG, FILE_TYPE_TAG,
            PARTITION_NUMBER_TAG,
        },
        pipeline::{ArtifactType, DataPipeline, PipelineStepHandler, StepContext},
        provider::{DynArtifactStore, DynEmbedder, DynMemoryDb},
    },
    err,
    error::DocAssistError,
    map_err,
};
use tracing::{debug, info};

/// Embeds every partition and stores it in the memory.
/// Record IDs are derived from the document and partition so rerunning the step overwrites
/// existing records.
#[derive(Clone)]
pub struct SaveRecordsHandler {
    store: DynArtifactStore,
    embedder: DynEmbedder,
    memory: DynMemoryDb,
}

impl SaveRecordsHandler {
    pub fn new(store: DynArtifactStore, embedder: DynEmbedder, memory: DynMemoryDb) -> Self {
        Self {
            store,
            embedder,
            memory,
        }
    }
}

#[async_trait::async_trait]
impl PipelineStepHandler for SaveRecordsHandler {
    fn step_name(&self) -> &'static str {
        SAVE_RECORDS_STEP
    }

    async fn invoke(
        &self,
        pipeline: &mut DataPipeline,
        ctx: &StepContext,
    ) -> Result<(), DocAssistError> {
        let DataPipeline {
            index,
            document_id,
            files,
            ..
        } = pipeline;
        let (index, document_id) = (index.as_str(), document_id.as_str());

        for file in files.iter_mut() {
            ctx.check_cancelled(SAVE_RECORDS_STEP)?;

            if file.already_processed_by(SAVE_RECORDS_STEP) {
                debug!("'{}' already saved, skipping", file.name);
                continue;
            }

            let partitions = file.artifacts(ArtifactType::TextPartition);

            if partitions.is_empty() {
                file.mark_processed_by(SAVE_RECORDS_STEP);
                continue;
            }

            let mut texts = Vec::with_capacity(partitions.len());
            for partition in partitions.iter() {
                let content = self.store.read(index, document_id, &partition.name).await?;
                texts.push(map_err!(String::from_utf8(content)));
            }

            let vectors = self
                .embedder
                .embed(&texts.iter().map(String::as_str).collect::<Vec<_>>())
                .await?;

            if vectors.len() != texts.len() {
                return err!(
                    Llm,
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                );
            }

            if let Some(vector) = vectors.first() {
                self.memory.create_index(index, vector.len()).await?;
            }

            for ((partition, text), vector) in partitions.iter().zip(texts).zip(vectors) {
                let mut tags = partition.tags.clone();
                add_tag(&mut tags, DOCUMENT_ID_TAG, document_id);
                add_tag(&mut tags, FILE_ID_TAG, file.id.as_str());
                add_tag(&mut tags, FILE_PART_TAG, partition.id.as_str());
                add_tag(
                    &mut tags,
                    PARTITION_NUMBER_TAG,
                    partition.partition_number.unwrap_or_default().to_string(),
                );
                add_tag(&mut tags, FILE_TYPE_TAG, file.mime_type.as_str());

                let record = MemoryRecord {
                    id: MemoryRecord::id_for(document_id, &partition.name),
                    vector,
                    text,
                    tags,
                };

                self.memory.upsert(index, record).await?;
            }

            for partition in partitions.iter() {
                if let Some(generated) = file.generated_files.get_mut(&partition.name) {
                    generated.processed_by.push(SAVE_RECORDS_STEP.to_string());
                }
            }

            info!(
                "Saved {} records for '{}' in '{index}'",
                partitions.len(),
                file.name
            );

            file.mark_processed_by(SAVE_RECORDS_STEP);
        }

        Ok(())
    }
}
