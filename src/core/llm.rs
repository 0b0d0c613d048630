//! Collaborators used to turn questions into API calls.

use crate::{err, error::DocAssistError, map_err};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, ops::Add};

/// Placeholder replaced with the retrieved document in the request prompt.
pub const SWAGGER_FILE_PLACEHOLDER: &str = "{{swagger-file}}";
/// Placeholder replaced with the user's question in the summary prompt.
pub const INPUT_PLACEHOLDER: &str = "{{input}}";
/// Placeholder replaced with the executed request in the summary prompt.
pub const REQUEST_PLACEHOLDER: &str = "{{request}}";
/// Placeholder replaced with the API's response in the summary prompt.
pub const RESPONSE_PLACEHOLDER: &str = "{{response}}";

const DEFAULT_SWAGGER_PROMPT: &str = r#"You are an assistant that turns questions into HTTP requests.
Use only the endpoints described in the following Swagger document:

{{swagger-file}}

Answer with a single line in the form `VERB URL BODY` where VERB is one of GET, POST, PUT, PATCH or DELETE,
URL is the absolute URL including the query string and BODY is the JSON request body.
Omit BODY for GET and DELETE requests. Do not add explanations or formatting."#;

const DEFAULT_SUMMARY_PROMPT: &str = r#"A user asked the following question:

{{input}}

To answer it, the following HTTP request was executed:

{{request}}

The API responded with:

{{response}}

Answer the user's question based on the response, in plain language a non technical person understands.
If the request failed, explain what went wrong."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: Self) -> Self::Output {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

/// The model's answer along with what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Chat completion model.
#[async_trait::async_trait]
pub trait ChatCompletion {
    fn id(&self) -> &'static str;

    /// Complete the conversation.
    ///
    /// * `messages`: Conversation history, starting with the system prompt.
    async fn complete(&self, messages: &[Message]) -> Result<Completion, DocAssistError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    fn requires_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl TryFrom<&str> for Verb {
    type Error = DocAssistError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => err!(InvalidRequest, "unsupported HTTP method '{value}'"),
        }
    }
}

impl Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{verb}")
    }
}

/// A request generated by the model, in the form `VERB URL [BODY]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpRequest {
    pub verb: Verb,
    pub url: String,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Parse the model's output. Surrounding code fences are ignored.
    /// Bodies are only kept for methods that accept them and required for those.
    ///
    /// * `text`: Model output.
    pub fn parse(text: &str) -> Result<Self, DocAssistError> {
        let text = strip_code_fence(text);

        let Some((verb, rest)) = text.split_once(char::is_whitespace) else {
            return err!(InvalidRequest, "expected `VERB URL [BODY]`, got '{text}'");
        };

        let verb = Verb::try_from(verb)?;

        let rest = rest.trim_start();
        let (url, body) = match rest.split_once(char::is_whitespace) {
            Some((url, body)) => (url, Some(body.trim())),
            None => (rest, None),
        };

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return err!(InvalidRequest, "expected an absolute URL, got '{url}'");
        }

        let body = body.filter(|body| !body.is_empty());

        let body = match (verb.requires_body(), body) {
            (true, Some(body)) => Some(body.to_string()),
            (true, None) => return err!(InvalidRequest, "{verb} request without a body"),
            (false, _) => None,
        };

        Ok(Self {
            verb,
            url: url.to_string(),
            body,
        })
    }
}

impl Display for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.body {
            Some(ref body) => write!(f, "{} {} {body}", self.verb, self.url),
            None => write!(f, "{} {}", self.verb, self.url),
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();

    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the language identifier, if any
    let inner = match inner.split_once('\n') {
        Some((_, inner)) => inner,
        None => inner,
    };

    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Outcome of an executed [HttpRequest].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// The request as generated by the model.
    pub request: String,

    /// HTTP status code.
    pub code: u16,

    /// Raw response body.
    pub message: String,

    pub is_success: bool,

    /// The response body handed to the summary prompt.
    pub result: String,
}

/// Executes requests generated by the model.
#[async_trait::async_trait]
pub trait HttpRequestExecutor {
    fn id(&self) -> &'static str;

    /// Execute the request, sending `api_key` in the `api_key` header if given.
    ///
    /// * `request`: The request to execute.
    /// * `api_key`: API key stored with the document.
    async fn execute(
        &self,
        request: &HttpRequest,
        api_key: Option<&str>,
    ) -> Result<ApiResponse, DocAssistError>;
}

/// Prompt templates for request generation and answer summaries.
#[derive(Debug, Clone)]
pub struct Prompts {
    swagger: String,
    summary: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            swagger: DEFAULT_SWAGGER_PROMPT.to_string(),
            summary: DEFAULT_SUMMARY_PROMPT.to_string(),
        }
    }
}

impl Prompts {
    /// Load the prompts, reading overrides from the given files.
    ///
    /// * `swagger_path`: Request generation prompt, must contain `{{swagger-file}}`.
    /// * `summary_path`: Summary prompt.
    pub async fn load(
        swagger_path: Option<&str>,
        summary_path: Option<&str>,
    ) -> Result<Self, DocAssistError> {
        let mut prompts = Self::default();

        if let Some(path) = swagger_path {
            prompts.swagger = map_err!(tokio::fs::read_to_string(path).await);
            if !prompts.swagger.contains(SWAGGER_FILE_PLACEHOLDER) {
                tracing::warn!("Prompt '{path}' is missing {SWAGGER_FILE_PLACEHOLDER}");
            }
        }

        if let Some(path) = summary_path {
            prompts.summary = map_err!(tokio::fs::read_to_string(path).await);
        }

        Ok(prompts)
    }

    /// The system prompt for generating a request against `swagger_file`.
    pub fn swagger(&self, swagger_file: &str) -> String {
        self.swagger.replace(SWAGGER_FILE_PLACEHOLDER, swagger_file)
    }

    /// The prompt for summarizing the response to a question.
    pub fn summary(&self, input: &str, request: &str, response: &str) -> String {
        self.summary
            .replace(INPUT_PLACEHOLDER, input)
            .replace(REQUEST_PLACEHOLDER, request)
            .replace(RESPONSE_PLACEHOLDER, response)
    }
}
