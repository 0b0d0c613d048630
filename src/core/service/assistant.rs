use super::search::{dto::SwaggerDocument, SearchService};
use crate::{
    core::{
        llm::{ApiResponse, Completion, HttpRequest, Message, Prompts, TokenUsage},
        provider::ProviderState,
    },
    error::DocAssistError,
};
use dto::CompletionInfo;
use tracing::{debug, info};

/// Answers questions by generating and executing requests against the stored APIs.
#[derive(Clone)]
pub struct AssistantService {
    providers: ProviderState,
    search: SearchService,
    prompts: Prompts,
}

/// A request generated from a question.
#[derive(Debug, Clone)]
pub struct GeneratedRequest {
    pub request: HttpRequest,
    pub usage: TokenUsage,
}

impl AssistantService {
    pub fn new(providers: ProviderState, search: SearchService, prompts: Prompts) -> Self {
        Self {
            providers,
            search,
            prompts,
        }
    }

    /// Answer the question with the API most relevant to it.
    ///
    /// * `question`: The user's question.
    pub async fn ask_api(&self, question: &str) -> Result<CompletionInfo, DocAssistError> {
        let document = self.search.search_document(question).await?;

        info!(
            "Answering with {:?} from '{}'",
            document.endpoints, document.swagger_file
        );

        let mut info = self
            .answer(
                &document.swagger_content,
                question,
                document.api_key.as_deref(),
            )
            .await?;

        info.swagger_document = Some(document);

        Ok(info)
    }

    /// Answer the question with the given document, skipping retrieval.
    ///
    /// * `swagger`: The API description to use.
    /// * `question`: The user's question.
    pub async fn ask_api_with(
        &self,
        swagger: &str,
        question: &str,
    ) -> Result<CompletionInfo, DocAssistError> {
        self.answer(swagger, question, None).await
    }

    /// Have the model write the request answering the question.
    ///
    /// * `swagger`: The API description the request targets.
    /// * `question`: The user's question.
    pub async fn generate_request(
        &self,
        swagger: &str,
        question: &str,
    ) -> Result<GeneratedRequest, DocAssistError> {
        let messages = [
            Message::system(self.prompts.swagger(swagger)),
            Message::user(question),
        ];

        let Completion { content, usage } = self.providers.chat.complete(&messages).await?;

        debug!("Generated request '{content}'");

        let request = HttpRequest::parse(&content)?;

        Ok(GeneratedRequest { request, usage })
    }

    /// Explain the API's response in plain language.
    ///
    /// * `question`: The user's question.
    /// * `request`: The executed request.
    /// * `response`: The API's response.
    pub async fn summarize(
        &self,
        question: &str,
        request: &str,
        response: &str,
    ) -> Result<Completion, DocAssistError> {
        let messages = [Message::user(
            self.prompts.summary(question, request, response),
        )];
        self.providers.chat.complete(&messages).await
    }

    async fn answer(
        &self,
        swagger: &str,
        question: &str,
        api_key: Option<&str>,
    ) -> Result<CompletionInfo, DocAssistError> {
        let GeneratedRequest { request, usage } = self.generate_request(swagger, question).await?;

        let response = self.providers.executor.execute(&request, api_key).await?;

        info!(
            "Executed '{} {}' with status {}",
            request.verb, request.url, response.code
        );

        let summary = self
            .summarize(question, &response.request, &response.result)
            .await?;

        let usage = usage + summary.usage;

        Ok(CompletionInfo {
            final_result: summary.content,
            request: response.request.clone(),
            response,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            swagger_document: None,
        })
    }
}

/// Assistant service DTOs.
pub mod dto {
    use super::{ApiResponse, SwaggerDocument};
    use serde::Serialize;
    use utoipa::ToSchema;

    /// The answer to a question along with how it was obtained.
    #[derive(Debug, Clone, Serialize, ToSchema)]
    #[serde(rename_all = "camelCase")]
    pub struct CompletionInfo {
        /// The answer.
        pub final_result: String,

        /// The executed request.
        pub request: String,

        pub response: ApiResponse,

        pub prompt_tokens: usize,

        pub completion_tokens: usize,

        pub total_tokens: usize,

        /// The retrieved document. Not set when the document was given.
        pub swagger_document: Option<SwaggerDocument>,
    }
}
