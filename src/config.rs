use clap::Parser;

/// The default index partitions get stored in.
pub const DEFAULT_INDEX_NAME: &str = "default";
/// The default upload path for the `fs` artifact storage.
const DEFAULT_UPLOAD_PATH: &str = "upload";
/// The default address to listen on.
const DEFAULT_ADDRESS: &str = "0.0.0.0:42070";
/// Default timeout for generated API requests, in seconds.
const DEFAULT_REQUEST_TIMEOUT: &str = "5";
/// The maximum amount of partitions retrieved when searching for relevant partitions.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
/// The amount of top ranked partitions merged into the document handed to the LLM.
pub const MERGE_PARTITION_LIMIT: usize = 3;

#[cfg(feature = "openai")]
const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
#[cfg(feature = "openai")]
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
#[cfg(feature = "openai")]
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Parser)]
#[command(name = "docassist", version = "0.1", about = "Ask questions about your APIs", long_about = None)]
pub struct StartArgs {
    /// RUST_LOG string to use as the env filter.
    #[arg(short, long)]
    log: Option<String>,

    /// Address to listen on.
    #[arg(short, long)]
    address: Option<String>,

    /// Base directory of the `FsArtifactStore`.
    #[arg(short, long)]
    upload_path: Option<String>,

    /// Name of the memory index partitions are stored in.
    #[arg(short, long)]
    index: Option<String>,

    /// CORS allowed origins.
    #[arg(long)]
    cors_allowed_origins: Option<String>,

    /// Path to a file overriding the request generation system prompt.
    #[arg(long)]
    swagger_prompt_path: Option<String>,

    /// Path to a file overriding the summary prompt.
    #[arg(long)]
    summary_prompt_path: Option<String>,

    /// Timeout in seconds for executing generated API requests.
    #[arg(long)]
    request_timeout: Option<String>,

    /// Qdrant URL.
    #[cfg(feature = "qdrant")]
    #[arg(short, long)]
    qdrant_url: Option<String>,

    /// OpenAI compatible endpoint used for embeddings and chat completions.
    #[cfg(feature = "openai")]
    #[arg(long)]
    openai_endpoint: Option<String>,

    /// Embedding model.
    #[cfg(feature = "openai")]
    #[arg(long)]
    embedding_model: Option<String>,

    /// Chat completion model.
    #[cfg(feature = "openai")]
    #[arg(long)]
    chat_model: Option<String>,
}

/// Implement a getter method on [StartArgs], using the `$var` environment variable as a fallback
/// and either panic or default if neither the argument nor the environment variable is set.
macro_rules! arg {
    ($id:ident, $var:literal, panic $msg:literal) => {
        impl StartArgs {
            pub fn $id(&self) -> String {
                match &self.$id {
                    Some(val) => val.to_string(),
                    None => match std::env::var($var) {
                        Ok(val) => val,
                        Err(_) => panic!($msg),
                    },
                }
            }
        }
    };
    ($id:ident, $var:literal, default $value:expr) => {
        impl StartArgs {
            pub fn $id(&self) -> String {
                match &self.$id {
                    Some(val) => val.to_string(),
                    None => match std::env::var($var) {
                        Ok(val) => val,
                        Err(_) => $value,
                    },
                }
            }
        }
    };
    ($id:ident, $var:literal, optional) => {
        impl StartArgs {
            pub fn $id(&self) -> Option<String> {
                match &self.$id {
                    Some(val) => Some(val.to_string()),
                    None => std::env::var($var).ok(),
                }
            }
        }
    };
}

impl StartArgs {
    pub fn allowed_origins(&self) -> Vec<String> {
        let origins = match &self.cors_allowed_origins {
            Some(origins) => origins.clone(),
            None => std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
        };

        origins
            .split(',')
            .filter_map(|o| (!o.is_empty()).then_some(String::from(o)))
            .collect()
    }

    pub fn request_timeout_secs(&self) -> u64 {
        let timeout = self.request_timeout();
        timeout
            .parse()
            .unwrap_or_else(|_| panic!("Invalid request timeout '{timeout}'; expected seconds"))
    }

    #[cfg(feature = "openai")]
    pub fn open_ai_key(&self) -> String {
        std::env::var("OPENAI_KEY").expect("Missing OPENAI_KEY in env")
    }
}

arg!(log,                 "RUST_LOG",             default "info".to_string());
arg!(address,             "ADDRESS",              default DEFAULT_ADDRESS.to_string());
arg!(upload_path,         "UPLOAD_PATH",          default DEFAULT_UPLOAD_PATH.to_string());
arg!(index,               "MEMORY_INDEX",         default DEFAULT_INDEX_NAME.to_string());
arg!(request_timeout,     "REQUEST_TIMEOUT_SECS", default DEFAULT_REQUEST_TIMEOUT.to_string());
arg!(swagger_prompt_path, "SWAGGER_PROMPT_PATH",  optional);
arg!(summary_prompt_path, "SUMMARY_PROMPT_PATH",  optional);

#[cfg(feature = "qdrant")]
arg!(qdrant_url,          "QDRANT_URL",           panic   "Qdrant url not found; Pass --qdrant-url or set QDRANT_URL");

#[cfg(feature = "openai")]
arg!(openai_endpoint,     "OPENAI_ENDPOINT",      default DEFAULT_OPENAI_ENDPOINT.to_string());
#[cfg(feature = "openai")]
arg!(embedding_model,     "EMBEDDING_MODEL",      default DEFAULT_EMBEDDING_MODEL.to_string());
#[cfg(feature = "openai")]
arg!(chat_model,          "CHAT_MODEL",           default DEFAULT_CHAT_MODEL.to_string());
