use super::api::ApiDoc;
use crate::app::{state::AppState, status::IndexStatusInfo};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use std::time::Duration;
use tower_http::{classify::ServerErrorsFailureClass, cors::CorsLayer, trace::TraceLayer};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub(super) mod assistant;
pub(super) mod document;

pub(super) use assistant::*;
pub(super) use document::*;

/// Maximum size of uploaded forms.
const UPLOAD_LIMIT: usize = 50_000_000;

pub fn router(state: AppState, origins: Vec<String>) -> Router {
    let origins = origins
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => {
                tracing::info!("Adding {origin} to allowed origins");
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Invalid origin '{origin}': {e}");
                None
            }
        });

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::list(origins))
        .allow_headers(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE]);

    let ingest = Router::new()
        .route("/documents", post(upload_documents))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .route("/status", get(index_status))
        .with_state(state.clone());

    Router::new()
        .route("/documents/:id", delete(delete_document))
        .route("/documents/:id/status", get(document_status))
        .route("/memory", delete(remove_memory))
        .route("/search", get(search))
        .route("/ask", post(ask))
        .with_state(state.services.clone())
        .merge(ingest)
        .layer(
            TraceLayer::new_for_http()
                .on_request(|req: &axum::http::Request<_>, _span: &Span| {
                    let ctype = req
                        .headers()
                        .get("content-type")
                        .map(|v| v.to_str().unwrap_or("none"))
                        .unwrap_or("none");

                    tracing::info!(
                        "Processing request | {} {} | content-type: {ctype}",
                        req.method(),
                        req.uri().path()
                    );
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        let status = res.status();
                        let ctype = res
                            .headers()
                            .get("content-type")
                            .map(|v| v.to_str().unwrap_or("none"))
                            .unwrap_or("none");

                        tracing::info!(
                            "Sending response | {status} | {}ms | {ctype}",
                            latency.as_millis()
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Error in request: {error}")
                    },
                ),
        )
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Has to go last to exclude all the tracing/cors layers
        .route("/_health", get(health_check))
}

#[utoipa::path(
    get,
    path = "/_health",
    responses(
        (status = 200, description = "The server is up", body = String),
    )
)]
pub(super) async fn health_check() -> impl IntoResponse {
    "OK"
}

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "State of the latest ingestion", body = IndexStatusInfo),
    )
)]
pub(super) async fn index_status(state: State<AppState>) -> Json<IndexStatusInfo> {
    Json(state.status.snapshot())
}
