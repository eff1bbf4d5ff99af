//! Error types for the lab server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures talking to the hosted model. None of these reach the user:
/// the assistant answers from its offline bank instead.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant has no API key configured")]
    NotConfigured,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to model failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model returned HTTP {status}")]
    Status { status: u16 },

    #[error("model response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("model response is missing {field}")]
    MissingField { field: &'static str },
}

#[derive(Debug, Error)]
pub enum LabError {
    #[error("unknown equipment '{id}'")]
    UnknownEquipment { id: String },

    #[error("question is empty")]
    EmptyQuestion,

    #[error("component label is empty")]
    EmptyLabel,
}

impl IntoResponse for LabError {
    fn into_response(self) -> Response {
        let status = match self {
            LabError::UnknownEquipment { .. } => StatusCode::NOT_FOUND,
            LabError::EmptyQuestion | LabError::EmptyLabel => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
