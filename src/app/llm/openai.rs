use crate::{
    app::embedder::openai::OpenAIError,
    core::llm::{ChatCompletion, Completion, Message, TokenUsage},
    err,
    error::DocAssistError,
    map_err,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chat completions from an OpenAI compatible `/v1/chat/completions` endpoint.
pub struct OpenAiChat {
    endpoint: String,
    key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChat {
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
impl ChatCompletion for OpenAiChat {
    fn id(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, DocAssistError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        };

        let response = map_err!(
            self.client
                .post(format!("{}/v1/chat/completions", self.endpoint))
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

        let response = map_err!(response.json::<ChatResponse>().await);

        let Some(choice) = response.choices.into_iter().next() else {
            return err!(Llm, "completion without choices");
        };

        let usage = response
            .usage
            .map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })
            .unwrap_or_default();

        debug!(
            "Completed with '{}', used tokens {}-{}-{} (prompt-completion-total)",
            response.model, usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{ChatRequest, ChatResponse};
    use crate::core::llm::Message;

    #[test]
    fn request_shape() {
        let messages = [Message::system("Be brief."), Message::user("Hi")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
        };

        assert_eq!(
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "Be brief." },
                    { "role": "user", "content": "Hi" }
                ],
                "temperature": 0.0
            }),
            serde_json::to_value(&request).unwrap()
        );
    }

    #[test]
    fn response_with_usage() {
        let response: ChatResponse = serde_json::from_str(
            r#"{
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "model": "gpt-4o-mini",
                "choices": [
                    { "index": 0, "message": { "role": "assistant", "content": "GET https://a.b/pets" }, "finish_reason": "stop" }
                ],
                "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
            }"#,
        )
        .unwrap();

        assert_eq!(
            Some("GET https://a.b/pets"),
            response.choices[0].message.content.as_deref()
        );
        assert_eq!(15, response.usage.unwrap().total_tokens);
    }
}
