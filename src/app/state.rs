use super::{
    document::store::FsArtifactStore, llm::executor::ReqwestExecutor, status::IndexStatusTracker,
};
use crate::core::{
    llm::Prompts,
    pipeline::StepContext,
    provider::{DynChatCompletion, DynEmbedder, DynMemoryDb, ProviderState},
    service::{assistant::AssistantService, memory::MemoryService, search::SearchService},
};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    /// Docassist services.
    pub services: ServiceState,

    /// Downstream service providers for docassist services.
    /// Used for displaying some metadata and in tests.
    pub providers: ProviderState,

    /// State of the latest ingestion.
    pub status: IndexStatusTracker,

    /// Set to `true` on shutdown to cancel running ingestions.
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Load the application state using the provided configuration.
    pub async fn new(args: &crate::config::StartArgs) -> Self {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from(args.log()))
            .init();

        let store = Arc::new(FsArtifactStore::new(&args.upload_path()));

        let executor = Arc::new(
            ReqwestExecutor::new(Duration::from_secs(args.request_timeout_secs()))
                .expect("unable to build HTTP client"),
        );

        let providers = ProviderState {
            store,
            memory: Self::init_memory(args),
            embedder: Self::init_embedder(args),
            chat: Self::init_chat(args),
            executor,
        };

        let prompts = Prompts::load(
            args.swagger_prompt_path().as_deref(),
            args.summary_prompt_path().as_deref(),
        )
        .await
        .expect("unable to load prompts");

        info!(
            "Using store '{}', memory '{}', embedder '{}', chat '{}'",
            providers.store.id(),
            providers.memory.id(),
            providers.embedder.id(),
            providers.chat.id()
        );

        let services = ServiceState::new(providers.clone(), &args.index(), prompts);

        Self::with_services(services, providers)
    }

    fn init_memory(_args: &crate::config::StartArgs) -> DynMemoryDb {
        #[cfg(feature = "qdrant")]
        {
            crate::app::memory::qdrant::init(&_args.qdrant_url())
        }

        #[cfg(not(feature = "qdrant"))]
        {
            Arc::new(crate::app::memory::inmemory::InMemoryDb::new())
        }
    }

    fn init_embedder(_args: &crate::config::StartArgs) -> DynEmbedder {
        #[cfg(not(feature = "openai"))]
        compile_error!("the `openai` feature must be enabled");

        #[cfg(feature = "openai")]
        Arc::new(crate::app::embedder::openai::OpenAiEmbeddings::new(
            &_args.openai_endpoint(),
            &_args.open_ai_key(),
            &_args.embedding_model(),
        ))
    }

    fn init_chat(_args: &crate::config::StartArgs) -> DynChatCompletion {
        #[cfg(feature = "openai")]
        Arc::new(crate::app::llm::openai::OpenAiChat::new(
            &_args.openai_endpoint(),
            &_args.open_ai_key(),
            &_args.chat_model(),
        ))
    }

    /// Build the state from already initialised services.
    pub fn with_services(services: ServiceState, providers: ProviderState) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            services,
            providers,
            status: IndexStatusTracker::new(),
            shutdown: Arc::new(shutdown),
        }
    }

    /// A context for an ingestion, cancelled on shutdown and reporting to [Self::status].
    pub fn step_context(&self) -> StepContext {
        StepContext::new(self.shutdown.subscribe(), self.status.sink())
    }

    /// Cancel running ingestions.
    pub fn shutdown(&self) {
        info!("Shutting down, cancelling running ingestions");
        self.shutdown.send_replace(true);
    }
}

#[derive(Clone)]
pub struct ServiceState {
    pub memory: MemoryService,
    pub search: SearchService,
    pub assistant: AssistantService,
}

impl ServiceState {
    pub fn new(providers: ProviderState, index: &str, prompts: Prompts) -> Self {
        let memory = MemoryService::new(providers.clone(), index);
        let search = SearchService::new(memory.clone());
        let assistant = AssistantService::new(providers, search.clone(), prompts);
        Self {
            memory,
            search,
            assistant,
        }
    }
}
