#[rustfmt::skip]
use super::router::{
    __path_health_check,
    __path_index_status,
    // Documents
    __path_upload_documents,
    __path_delete_document,
    __path_document_status,
    __path_remove_memory,
    // Assistant
    __path_search,
    __path_ask,
};
use super::dto::{AskPayload, UploadResult};
use crate::{
    app::status::{IndexStatus, IndexStatusInfo},
    core::{
        llm::ApiResponse,
        pipeline::{ArtifactType, DataPipeline, FileDetails, GeneratedFileDetails, PipelineLogEntry},
        service::{assistant::dto::CompletionInfo, search::dto::SwaggerDocument},
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        index_status,
        // Documents
        upload_documents,
        delete_document,
        document_status,
        remove_memory,
        // Assistant
        search,
        ask,
    ),
    components(schemas(
        UploadResult,
        DataPipeline,
        FileDetails,
        GeneratedFileDetails,
        PipelineLogEntry,
        ArtifactType,
        IndexStatus,
        IndexStatusInfo,
        AskPayload,
        SwaggerDocument,
        CompletionInfo,
        ApiResponse,
    )),
    tags(
        (name = "docassist", description = "Ask questions about your APIs")
    )
)]
pub(super) struct ApiDoc;
