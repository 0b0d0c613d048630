//! Http specific DTOs.

use crate::core::pipeline::DataPipeline;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use validify::Validify;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct UploadResult {
    /// Pipelines of the imported documents.
    pub documents: Vec<DataPipeline>,

    /// Map file names to errors
    pub errors: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize, Validify, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct AskPayload {
    /// What to ask the API.
    #[modify(trim)]
    #[validate(length(min = 1, message = "Question cannot be empty."))]
    pub question: String,
}

#[derive(Debug, Deserialize, Validify, IntoParams)]
#[into_params(parameter_in = Query)]
pub(super) struct SearchQuery {
    /// Text to search the stored API descriptions by.
    #[modify(trim)]
    #[validate(length(min = 1, message = "Query cannot be empty."))]
    pub q: String,
}
