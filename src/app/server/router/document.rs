use crate::{
    app::{
        server::dto::UploadResult,
        state::{AppState, ServiceState},
    },
    core::{pipeline::DataPipeline, service::memory::dto::SwaggerUpload},
    error::DocAssistError,
    map_err,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::collections::HashMap;

/// Name of the form field holding the key used when calling the uploaded APIs.
const API_KEY_FIELD: &str = "apiKey";

#[utoipa::path(
    post,
    path = "/documents",
    responses(
        (status = 200, description = "Import API descriptions, one document per file", body = UploadResult),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    ),
    request_body = Multipart
)]
pub(in crate::app::server) async fn upload_documents(
    state: State<AppState>,
    mut form: Multipart,
) -> Result<Json<UploadResult>, DocAssistError> {
    let mut api_key = None;
    let mut files = vec![];
    let mut errors = HashMap::<String, Vec<String>>::new();

    while let Ok(Some(field)) = form.next_field().await {
        if field.name() == Some(API_KEY_FIELD) {
            api_key = Some(map_err!(field.text().await));
            continue;
        }

        let Some(name) = field.file_name() else {
            continue;
        };

        let name = name.to_string();

        match field.bytes().await {
            Ok(bytes) => files.push((name, bytes)),
            Err(e) => {
                tracing::error!("error in form: {e}");
                errors.entry(name).or_default().push(e.to_string());
            }
        }
    }

    let ctx = state.step_context();
    let mut documents = vec![];

    for (name, content) in files {
        state.status.start(&name);

        let upload = SwaggerUpload {
            file_name: name.clone(),
            content: &content,
            api_key: api_key.clone(),
        };

        match state.services.memory.upload_swagger(upload, &ctx).await {
            Ok(pipeline) => {
                state.status.succeed();
                documents.push(pipeline);
            }
            Err(e) => {
                e.print();
                state.status.fail(&e);
                errors.entry(name).or_default().push(e.to_string());
            }
        }
    }

    Ok(Json(UploadResult { documents, errors }))
}

#[utoipa::path(
    delete,
    path = "/documents/{id}",
    responses(
        (status = 204, description = "Delete a document's records and artifacts"),
        (status = 404, description = "Document not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = String, Path, description = "Document ID")
    )
)]
pub(in crate::app::server) async fn delete_document(
    services: State<ServiceState>,
    Path(id): Path<String>,
) -> Result<StatusCode, DocAssistError> {
    services.memory.delete_document(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/documents/{id}/status",
    responses(
        (status = 200, description = "Ingestion state of a document", body = DataPipeline),
        (status = 404, description = "Document not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = String, Path, description = "Document ID")
    )
)]
pub(in crate::app::server) async fn document_status(
    services: State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<DataPipeline>, DocAssistError> {
    Ok(Json(services.memory.pipeline_status(&id).await?))
}

#[utoipa::path(
    delete,
    path = "/memory",
    responses(
        (status = 204, description = "Delete every index and stored artifact"),
        (status = 500, description = "Internal server error")
    )
)]
pub(in crate::app::server) async fn remove_memory(
    services: State<ServiceState>,
) -> Result<StatusCode, DocAssistError> {
    services.memory.remove_memory().await?;
    Ok(StatusCode::NO_CONTENT)
}
