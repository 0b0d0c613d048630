use std::{error::Error as _, string::FromUtf8Error};
use thiserror::Error;
use tracing::error;
use validify::ValidationErrors;

#[cfg(feature = "qdrant")]
use qdrant_client::QdrantError;

pub mod http;

#[derive(Debug, Error)]
pub enum DocAssistErr {
    #[error("Malformed document; {0}")]
    MalformedDocument(String),

    #[error("No results; {0}")]
    NoResults(String),

    #[error("Unsupported content type; {0}")]
    UnsupportedContentType(String),

    #[error("Duplicate path; {0}")]
    DuplicatePath(String),

    #[error("Does not exist; {0}")]
    DoesNotExist(String),

    #[error("Invalid file name; {0}")]
    InvalidFileName(String),

    #[error("Invalid document ID; {0}")]
    InvalidDocumentId(String),

    #[error("Invalid request; {0}")]
    InvalidRequest(String),

    #[error("Operation cancelled; {0}")]
    Cancelled(String),

    #[error("LLM; {0}")]
    Llm(String),

    #[error("Validation; {0}")]
    Validation(#[from] ValidationErrors),

    #[error("IO; {0}")]
    IO(#[from] std::io::Error),

    #[error("UTF-8; {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("JSON error; {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("YAML error; {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("Http client; {0}")]
    Reqwest(#[from] reqwest::Error),

    #[cfg(feature = "qdrant")]
    #[error("Qdrant; {0}")]
    Qdrant(#[from] QdrantError),

    #[error("Multipart; {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

#[derive(Debug, Error)]
#[error("{error}")]
pub struct DocAssistError {
    file: &'static str,
    line: u32,
    column: u32,
    pub error: DocAssistErr,
}

impl DocAssistError {
    pub fn new(file: &'static str, line: u32, column: u32, error: DocAssistErr) -> DocAssistError {
        DocAssistError {
            file,
            line,
            column,
            error,
        }
    }

    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }

    pub fn print(&self) {
        let location = self.location();

        error!("{location} | {self}");

        if self.error.source().is_some() {
            error!("Causes:");
        }

        let mut src = self.error.source();
        while let Some(source) = src {
            error!(" - {source}");
            src = source.source();
        }
    }
}

#[macro_export]
macro_rules! err {
    ($ty:ident $(, $l:literal $(,)? $($args:expr),* )?) => {
        Err($crate::error::DocAssistError::new(
            file!(),
            line!(),
            column!(),
            $crate::error::DocAssistErr::$ty $( (format!($l, $( $args, )*)) )?,
        ))
    };
}

#[macro_export]
macro_rules! map_err {
    ($ex:expr) => {
        $ex.map_err(|e| $crate::error::DocAssistError::new(file!(), line!(), column!(), e.into()))?
    };
}
