use crate::error::DocAssistError;

/// Operations related to embeddings.
#[async_trait::async_trait]
pub trait Embedder {
    fn id(&self) -> &'static str;

    /// The amount of tokens the embedding model accepts in a single input.
    fn max_tokens(&self) -> usize;

    /// Estimate the amount of tokens in `text`.
    /// Only used for diagnostics so the default approximates 4 bytes per token.
    ///
    /// * `text`: Input text.
    fn count_tokens(&self, text: &str) -> usize {
        text.len().div_ceil(4)
    }

    /// Embed the given inputs. Returns one vector per input, in order.
    ///
    /// * `content`: The text to embed.
    async fn embed(&self, content: &[&str]) -> Result<Vec<Vec<f32>>, DocAssistError>;
}
