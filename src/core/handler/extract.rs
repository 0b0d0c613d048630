use super::EXTRACT_STEP;
use crate::{
    core::{
        pipeline::{
            is_text, ArtifactType, DataPipeline, GeneratedFileDetails, PipelineStepHandler,
            StepContext, MIME_TEXT,
        },
        provider::DynArtifactStore,
    },
    error::{DocAssistErr, DocAssistError},
};
use tracing::{debug, warn};

/// Writes the text of every uploaded text file to `{name}.extract.txt`.
/// Files with other content types are skipped with a note in their log.
#[derive(Clone)]
pub struct TextExtractionHandler {
    store: DynArtifactStore,
}

impl TextExtractionHandler {
    pub fn new(store: DynArtifactStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl PipelineStepHandler for TextExtractionHandler {
    fn step_name(&self) -> &'static str {
        EXTRACT_STEP
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
        let (index, document_id) = (index.as_str(), document_id.as_str());

        for file in files.iter_mut() {
            ctx.check_cancelled(EXTRACT_STEP)?;

            if file.already_processed_by(EXTRACT_STEP) {
                debug!("'{}' already extracted, skipping", file.name);
                continue;
            }

            if !is_text(&file.mime_type) {
                let reason = DocAssistErr::UnsupportedContentType(file.mime_type.clone());
                warn!("Skipping '{}'; {reason}", file.name);
                file.log(EXTRACT_STEP, reason.to_string());
                file.mark_processed_by(EXTRACT_STEP);
                continue;
            }

            let content = self.store.read(index, document_id, &file.name).await?;

            let text = match String::from_utf8(content) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping '{}'; not valid UTF-8", file.name);
                    file.log(EXTRACT_STEP, format!("content is not valid UTF-8; {e}"));
                    file.mark_processed_by(EXTRACT_STEP);
                    continue;
                }
            };

            let name = format!("{}.extract.txt", file.name);

            self.store
                .write(index, document_id, &name, text.as_bytes())
                .await?;

            let artifact = GeneratedFileDetails::new(
                file,
                name.clone(),
                MIME_TEXT,
                ArtifactType::ExtractedText,
                text.as_bytes(),
                tags.clone(),
            );

            debug!("Extracted '{}' ({} bytes)", name, artifact.size);

            file.generated_files.insert(name, artifact);
            file.mark_processed_by(EXTRACT_STEP);
        }

        Ok(())
    }
}
