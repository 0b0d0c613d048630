use crate::{
    app::{
        server::dto::{AskPayload, SearchQuery},
        state::ServiceState,
    },
    core::service::{assistant::dto::CompletionInfo, search::dto::SwaggerDocument},
    error::DocAssistError,
    map_err,
};
use axum::{
    extract::{Query, State},
    Json,
};
use validify::Validify;

#[utoipa::path(
    get,
    path = "/search",
    responses(
        (status = 200, description = "The stored API description most relevant to the query", body = SwaggerDocument),
        (status = 404, description = "Nothing relevant is stored"),
        (status = 422, description = "Invalid query"),
        (status = 500, description = "Internal server error")
    ),
    params(SearchQuery)
)]
pub(in crate::app::server) async fn search(
    services: State<ServiceState>,
    Query(mut query): Query<SearchQuery>,
) -> Result<Json<SwaggerDocument>, DocAssistError> {
    map_err!(query.validify());
    Ok(Json(services.search.search_document(&query.q).await?))
}

#[utoipa::path(
    post,
    path = "/ask",
    responses(
        (status = 200, description = "Answer a question by calling the most relevant API", body = CompletionInfo),
        (status = 404, description = "Nothing relevant is stored"),
        (status = 422, description = "Invalid question"),
        (status = 502, description = "The model did not produce a usable request"),
        (status = 500, description = "Internal server error")
    ),
    request_body = AskPayload
)]
pub(in crate::app::server) async fn ask(
    services: State<ServiceState>,
    Json(mut payload): Json<AskPayload>,
) -> Result<Json<CompletionInfo>, DocAssistError> {
    map_err!(payload.validify());
    Ok(Json(services.assistant.ask_api(&payload.question).await?))
}
