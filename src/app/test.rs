//! Test suites and utilites.

mod assistant;

use super::{
    document::store::FsArtifactStore,
    memory::inmemory::InMemoryDb,
    state::{AppState, ServiceState},
};
use crate::{
    config::DEFAULT_INDEX_NAME,
    core::{
        embedder::Embedder,
        llm::{
            ApiResponse, ChatCompletion, Completion, HttpRequest, HttpRequestExecutor, Message,
            Prompts, Role, TokenUsage,
        },
        handler::{
            SwaggerPartitioningHandler, TextExtractionHandler, EXTRACT_STEP, PARTITION_STEP,
        },
        pipeline::{DataPipeline, PipelineOrchestrator, StepContext, UploadFile},
        provider::ProviderState,
        service::memory::dto::SwaggerUpload,
    },
    error::DocAssistError,
};
use std::sync::{Arc, Mutex};

/// Words the [KeywordEmbedder] counts. The last dimension is a constant bias.
const KEYWORDS: [&str; 6] = ["pet", "order", "store", "weather", "forecast", "city"];

/// Answer the [FakeChat] gives to summary prompts.
pub const SUMMARY: &str = "There is one pet called Rex.";

/// Body the [FakeExecutor] responds with.
pub const API_RESULT: &str = r#"[{"id":1,"name":"Rex"}]"#;

const USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 10,
    completion_tokens: 5,
    total_tokens: 15,
};

pub struct TestState {
    /// Holds the services under test.
    pub app: AppState,

    pub chat: Arc<FakeChat>,

    pub executor: Arc<FakeExecutor>,

    fs_store_path: String,
}

impl TestState {
    pub async fn init(config: TestStateConfig) -> Self {
        let _ = tokio::fs::remove_dir_all(&config.fs_store_path).await;

        let chat = Arc::new(FakeChat::new(&config.generated_request));
        let executor = Arc::new(FakeExecutor::default());

        let providers = ProviderState {
            store: Arc::new(FsArtifactStore::new(&config.fs_store_path)),
            memory: Arc::new(InMemoryDb::new()),
            embedder: Arc::new(KeywordEmbedder),
            chat: chat.clone(),
            executor: executor.clone(),
        };

        let services = ServiceState::new(providers.clone(), DEFAULT_INDEX_NAME, Prompts::default());

        TestState {
            app: AppState::with_services(services, providers),
            chat,
            executor,
            fs_store_path: config.fs_store_path,
        }
    }

    /// Import a swagger file with a context that is never cancelled.
    pub async fn upload(
        &self,
        file_name: &str,
        content: &str,
        api_key: Option<&str>,
    ) -> Result<DataPipeline, DocAssistError> {
        let upload = SwaggerUpload {
            file_name: file_name.to_string(),
            content: content.as_bytes(),
            api_key: api_key.map(String::from),
        };

        self.app
            .services
            .memory
            .upload_swagger(upload, &StepContext::detached())
            .await
    }

    /// A pipeline of the extract and partition steps, with its files uploaded.
    pub async fn partition_pipeline(
        &self,
        document_id: &str,
        files: Vec<UploadFile>,
    ) -> (PipelineOrchestrator, DataPipeline) {
        let store = self.app.providers.store.clone();
        let orchestrator = PipelineOrchestrator::new(store.clone())
            .with_handler(Arc::new(TextExtractionHandler::new(store.clone())))
            .with_handler(Arc::new(SwaggerPartitioningHandler::new(
                store,
                self.app.providers.embedder.clone(),
            )));

        let mut pipeline = DataPipeline::new(DEFAULT_INDEX_NAME, document_id, Default::default())
            .then(EXTRACT_STEP)
            .then(PARTITION_STEP);

        orchestrator
            .upload_files(&mut pipeline, files)
            .await
            .unwrap();

        (orchestrator, pipeline)
    }

    /// Names of the artifacts stored for a document.
    pub async fn artifacts(&self, document_id: &str) -> Vec<String> {
        let dir = format!("{}/{DEFAULT_INDEX_NAME}/{document_id}", self.fs_store_path);
        let mut entries = tokio::fs::read_dir(dir).await.unwrap();

        let mut names = vec![];
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        names
    }

    pub async fn teardown(self) {
        let _ = tokio::fs::remove_dir_all(&self.fs_store_path).await;
    }
}

pub struct TestStateConfig {
    pub fs_store_path: String,

    /// What the [FakeChat] answers request generation prompts with.
    pub generated_request: String,
}

impl TestStateConfig {
    pub fn new(fs_store_path: &str) -> Self {
        Self {
            fs_store_path: fs_store_path.to_string(),
            generated_request: "GET https://petstore.swagger.io/v2/pets".to_string(),
        }
    }
}

/// Embeds text as the amount of occurrences of each of the [KEYWORDS].
pub struct KeywordEmbedder;

#[async_trait::async_trait]
impl Embedder for KeywordEmbedder {
    fn id(&self) -> &'static str {
        "keyword"
    }

    fn max_tokens(&self) -> usize {
        8191
    }

    async fn embed(&self, content: &[&str]) -> Result<Vec<Vec<f32>>, DocAssistError> {
        Ok(content
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                KEYWORDS
                    .iter()
                    .map(|keyword| text.matches(keyword).count() as f32)
                    .chain(std::iter::once(1.0))
                    .collect()
            })
            .collect())
    }
}

/// Answers request generation prompts with a fixed request and everything else with [SUMMARY].
pub struct FakeChat {
    request: String,

    /// Messages of every completion, in order.
    pub calls: Mutex<Vec<Vec<Message>>>,
}

impl FakeChat {
    fn new(request: &str) -> Self {
        Self {
            request: request.to_string(),
            calls: Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl ChatCompletion for FakeChat {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, DocAssistError> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let content = match messages.first() {
            Some(Message {
                role: Role::System,
                ..
            }) => self.request.clone(),
            _ => SUMMARY.to_string(),
        };

        Ok(Completion {
            content,
            usage: USAGE,
        })
    }
}

/// Responds to every request with [API_RESULT] and records what it executed.
#[derive(Default)]
pub struct FakeExecutor {
    pub calls: Mutex<Vec<(HttpRequest, Option<String>)>>,
}

#[async_trait::async_trait]
impl HttpRequestExecutor for FakeExecutor {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn execute(
        &self,
        request: &HttpRequest,
        api_key: Option<&str>,
    ) -> Result<ApiResponse, DocAssistError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.clone(), api_key.map(String::from)));

        Ok(ApiResponse {
            request: request.to_string(),
            code: 200,
            message: API_RESULT.to_string(),
            is_success: true,
            result: API_RESULT.to_string(),
        })
    }
}
