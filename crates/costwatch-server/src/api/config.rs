use crate::api::{storage_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use costwatch_common::types::{NotificationConfig, UpdateConfigRequest};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Notification settings. Created with defaults on first read.
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "Config",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Current settings", body = NotificationConfig),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn get_config(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.repo.get_config().await)
}

/// Partial update. Only fields present in the body are applied; a schedule
/// change re-registers the weekly trigger.
#[utoipa::path(
    put,
    path = "/api/config",
    tag = "Config",
    security(("api_key" = [])),
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Updated settings", body = NotificationConfig),
        (status = 400, description = "Invalid value (err_code 1101 for schedule fields)", body = crate::api::ApiError)
    )
)]
async fn put_config(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(update): Json<UpdateConfigRequest>,
) -> impl IntoResponse {
    apply_update(&trace_id, &state, update).await
}

/// Same as `PUT /api/config`.
#[utoipa::path(
    post,
    path = "/api/config",
    tag = "Config",
    security(("api_key" = [])),
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Updated settings", body = NotificationConfig),
        (status = 400, description = "Invalid value (err_code 1101 for schedule fields)", body = crate::api::ApiError)
    )
)]
async fn post_config(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(update): Json<UpdateConfigRequest>,
) -> impl IntoResponse {
    apply_update(&trace_id, &state, update).await
}

async fn apply_update(trace_id: &str, state: &AppState, update: UpdateConfigRequest) -> Response {
    let (config, schedule_changed) = match state.repo.update_config(&update).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(trace_id, &e),
    };

    if schedule_changed {
        if let Err(e) = state.scheduler.reschedule(&config).await {
            // The document is already saved; the next restart picks it up.
            tracing::error!(trace_id = %trace_id, error = %e, "Failed to reschedule weekly report");
        }
    }
    tracing::info!(
        trace_id = %trace_id,
        schedule_changed,
        day = %config.schedule_day,
        hour = config.schedule_hour,
        "Notification config updated"
    );
    success_response(StatusCode::OK, trace_id, config)
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(get_config, put_config, post_config))
}
