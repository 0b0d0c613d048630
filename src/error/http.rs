use super::{DocAssistErr, DocAssistError};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

impl DocAssistError {
    pub fn status(&self) -> StatusCode {
        use DocAssistErr as E;
        use StatusCode as SC;
        match self.error {
            E::MalformedDocument(_)
            | E::UnsupportedContentType(_)
            | E::InvalidFileName(_)
            | E::InvalidDocumentId(_)
            | E::Validation(_) => SC::UNPROCESSABLE_ENTITY,
            E::NoResults(_) | E::DoesNotExist(_) => SC::NOT_FOUND,
            E::DuplicatePath(_) => SC::CONFLICT,
            E::Multipart(_) => SC::BAD_REQUEST,
            E::InvalidRequest(_) | E::Llm(_) | E::Reqwest(_) => SC::BAD_GATEWAY,
            E::Cancelled(_) => SC::SERVICE_UNAVAILABLE,
            E::IO(_) | E::Utf8(_) | E::SerdeJson(_) | E::SerdeYaml(_) => {
                SC::INTERNAL_SERVER_ERROR
            }

            #[cfg(feature = "qdrant")]
            E::Qdrant(_) => SC::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response wrapper.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseError<T: Serialize> {
    error_type: ErrorType,
    body: T,
}

impl<T> ResponseError<T>
where
    T: Serialize,
{
    pub fn new(error_type: ErrorType, body: T) -> Self {
        Self { error_type, body }
    }
}

#[derive(Debug, Serialize)]
enum ErrorType {
    Internal,
    Api,
}

impl<T> IntoResponse for ResponseError<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        <Json<ResponseError<T>> as IntoResponse>::into_response(Json(self))
    }
}

impl IntoResponse for DocAssistError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        self.print();

        use DocAssistErr as DE;
        use ErrorType as ET;

        match self.error {
            DE::MalformedDocument(e)
            | DE::NoResults(e)
            | DE::UnsupportedContentType(e)
            | DE::DuplicatePath(e)
            | DE::DoesNotExist(e)
            | DE::InvalidFileName(e)
            | DE::InvalidDocumentId(e)
            | DE::InvalidRequest(e) => (status, ResponseError::new(ET::Api, e)).into_response(),

            DE::Validation(errors) => (status, ResponseError::new(ET::Api, errors)).into_response(),

            DE::Multipart(e) => {
                (status, ResponseError::new(ET::Api, e.to_string())).into_response()
            }

            DE::Llm(e) | DE::Cancelled(e) => {
                (status, ResponseError::new(ET::Internal, e)).into_response()
            }

            DE::Reqwest(_) => (
                status,
                ResponseError::new(ET::Internal, "upstream".to_string()),
            )
                .into_response(),

            #[cfg(feature = "qdrant")]
            DE::Qdrant(_) => (status, "qdrant".to_string()).into_response(),

            DE::IO(_) | DE::Utf8(_) | DE::SerdeJson(_) | DE::SerdeYaml(_) => {
                (status, "Internal".to_string()).into_response()
            }
        }
    }
}
