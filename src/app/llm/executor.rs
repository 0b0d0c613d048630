use crate::{
    core::llm::{ApiResponse, HttpRequest, HttpRequestExecutor, Verb},
    error::DocAssistError,
    map_err,
};
use reqwest::{header::CONTENT_TYPE, Method};
use std::time::Duration;
use tracing::{debug, warn};

/// Header the stored API key is sent in.
pub const API_KEY_HEADER: &str = "api_key";

/// Status reported when the request never got a response.
const TRANSPORT_FAILURE_CODE: u16 = 400;

/// Executes generated requests over HTTP.
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    /// * `timeout`: Time allowed for a whole request.
    pub fn new(timeout: Duration) -> Result<Self, DocAssistError> {
        let client = map_err!(reqwest::Client::builder().timeout(timeout).build());
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpRequestExecutor for ReqwestExecutor {
    fn id(&self) -> &'static str {
        "reqwest"
    }

    async fn execute(
        &self,
        request: &HttpRequest,
        api_key: Option<&str>,
    ) -> Result<ApiResponse, DocAssistError> {
        let method = match request.verb {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);

        if let Some(api_key) = api_key {
            builder = builder.header(API_KEY_HEADER, api_key);
        }

        if let Some(ref body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request '{request}' failed: {e}");
                let message = e.to_string();
                return Ok(ApiResponse {
                    request: request.to_string(),
                    code: TRANSPORT_FAILURE_CODE,
                    message: message.clone(),
                    is_success: false,
                    result: message,
                });
            }
        };

        let status = response.status();
        let message = map_err!(response.text().await);

        debug!("'{request}' responded with {status}");

        Ok(ApiResponse {
            request: request.to_string(),
            code: status.as_u16(),
            is_success: status.is_success(),
            result: message.clone(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ReqwestExecutor, API_KEY_HEADER};
    use crate::core::llm::{HttpRequest, HttpRequestExecutor};
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Router,
    };
    use std::time::Duration;

    async fn serve() -> String {
        let router = Router::new()
            .route(
                "/pets",
                get(|headers: HeaderMap| async move {
                    let key = headers
                        .get(API_KEY_HEADER)
                        .and_then(|key| key.to_str().ok())
                        .unwrap_or("none")
                        .to_string();
                    format!("key={key}")
                })
                .post(|body: String| async move { (StatusCode::CREATED, body) }),
            )
            .route("/missing", post(|| async { StatusCode::NOT_FOUND }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn sends_api_key_and_body() {
        let base = serve().await;
        let executor = ReqwestExecutor::new(Duration::from_secs(5)).unwrap();

        let request = HttpRequest::parse(&format!("GET {base}/pets")).unwrap();
        let response = executor.execute(&request, Some("secret")).await.unwrap();
        assert_eq!(200, response.code);
        assert!(response.is_success);
        assert_eq!("key=secret", response.result);
        assert_eq!(request.to_string(), response.request);

        let response = executor.execute(&request, None).await.unwrap();
        assert_eq!("key=none", response.message);

        let request =
            HttpRequest::parse(&format!(r#"POST {base}/pets {{"name": "Rex"}}"#)).unwrap();
        let response = executor.execute(&request, None).await.unwrap();
        assert_eq!(201, response.code);
        assert_eq!(r#"{"name": "Rex"}"#, response.result);
    }

    #[tokio::test]
    async fn reports_failures() {
        let base = serve().await;
        let executor = ReqwestExecutor::new(Duration::from_secs(5)).unwrap();

        let request = HttpRequest::parse(&format!("POST {base}/missing {{}}")).unwrap();
        let response = executor.execute(&request, None).await.unwrap();
        assert_eq!(404, response.code);
        assert!(!response.is_success);

        // Nothing listens on the discard port
        let request = HttpRequest::parse("GET http://127.0.0.1:9/pets").unwrap();
        let response = executor.execute(&request, None).await.unwrap();
        assert!(!response.is_success);
        assert!(!response.message.is_empty());
    }
}
