pub mod config;
pub mod history;
pub mod insights;
pub mod limits;
pub mod reports;
pub mod system;
pub mod teams;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use costwatch_common::types::ConfigUpdateError;
use costwatch_storage::StorageError;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::state::AppState;

/// Error envelope.
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Business error code.
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
}

/// Uniform response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 0 on success.
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
    pub data: Option<T>,
}

/// Body of a background trigger acknowledgement.
#[derive(Serialize, ToSchema)]
pub struct TriggerResponse {
    pub message: String,
    /// Always `processing`.
    pub status: String,
}

impl TriggerResponse {
    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: "processing".to_string(),
        }
    }
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "unauthorized" => 1002,
        "not_found" => 1004,
        "conflict" => 1005,
        "invalid_schedule" => 1101,
        "internal_error" => 1500,
        "storage_error" => 1501,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Maps repository failures onto the envelope.
///
/// Input problems become 400; anything else is a failed write and answers 500.
pub fn storage_error_response(trace_id: &str, err: &StorageError) -> Response {
    match err {
        StorageError::DuplicateAccount(_) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "conflict", &err.to_string())
        }
        StorageError::InvalidConfig(ConfigUpdateError::InvalidSchedule(msg)) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "invalid_schedule", msg)
        }
        StorageError::InvalidConfig(ConfigUpdateError::Invalid(msg)) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", msg)
        }
        StorageError::InvalidMonth(_) | StorageError::InvalidKey(_) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", &err.to_string())
        }
        _ => {
            tracing::error!(trace_id = %trace_id, error = %err, "Storage operation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                &err.to_string(),
            )
        }
    }
}

pub fn not_found(trace_id: &str, what: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, trace_id, "not_found", what)
}

/// Routes reachable without an API key.
pub fn public_routes() -> OpenApiRouter<AppState> {
    system::public_routes()
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(system::protected_routes())
        .merge(teams::routes())
        .merge(config::routes())
        .merge(history::routes())
        .merge(reports::routes())
        .merge(insights::routes())
}
