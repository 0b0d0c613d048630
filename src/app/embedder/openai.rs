use crate::{core::embedder::Embedder, err, error::DocAssistError, map_err};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Input limit of the OpenAI embedding models.
const MAX_INPUT_TOKENS: usize = 8191;

/// Embeddings from an OpenAI compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbeddings {
    endpoint: String,
    key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbeddings {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbeddings {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn max_tokens(&self) -> usize {
        MAX_INPUT_TOKENS
    }

    async fn embed(&self, input: &[&str]) -> Result<Vec<Vec<f32>>, DocAssistError> {
        if input.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input,
        };

        let response = map_err!(
            self.client
                .post(format!("{}/v1/embeddings", self.endpoint))
                .bearer_auth(&self.key)
                .json(&request)
                .send()
                .await
        );

        if !response.status().is_success() {
            tracing::error!(
                "Request to {} failed with status {}",
                response.url(),
                response.status()
            );
            let error = map_err!(response.json::<OpenAIError>().await);
            return err!(Llm, "{error}");
        }

        let mut response = map_err!(response.json::<EmbeddingResponse>().await);

        debug!(
            "Embedded {} input(s) with '{}', used tokens {}-{} (prompt-total)",
            input.len(),
            response.model,
            response.usage.prompt_tokens,
            response.usage.total_tokens
        );

        // The API does not guarantee ordering
        response.data.sort_by_key(|o| o.index);

        Ok(response.data.into_iter().map(|o| o.embedding).collect())
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingObject>,
    model: String,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize, Error)]
#[error("{message}, type: {r#type}, param: {param:?}, code: {code:?}")]
pub struct OpenAIErrorParams {
    pub message: String,
    pub r#type: String,
    pub param: Option<String>,
    pub code: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Error)]
#[error("Open AI error response {{ {error} }}")]
pub struct OpenAIError {
    pub error: OpenAIErrorParams,
}
