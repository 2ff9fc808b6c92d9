use crate::api::success_response;
use crate::logging::TraceId;
use crate::scheduler::SchedulerStatus;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use costwatch_storage::StorageInfo;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Serialize, ToSchema)]
struct ServiceBanner {
    name: String,
    version: String,
    description: String,
}

/// Service name and version.
#[utoipa::path(
    get,
    path = "/api/",
    tag = "System",
    responses((status = 200, description = "Service banner", body = ServiceBanner))
)]
async fn root(Extension(trace_id): Extension<TraceId>) -> impl IntoResponse {
    success_response(
        StatusCode::OK,
        &trace_id,
        ServiceBanner {
            name: "costwatch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "AWS cost anomaly detection and weekly reporting".to_string(),
        },
    )
}

#[derive(Serialize, ToSchema)]
struct ServiceHealth {
    /// `healthy`, `degraded` (local fallback) or `unhealthy`.
    storage: String,
    /// `live`, `not_configured`, or `disabled` when the stored config turns
    /// AI off.
    ai: String,
    /// `configured` or `synthetic`.
    datadog: String,
    /// `running` or `stopped`.
    scheduler: String,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// `healthy` or `degraded`.
    status: String,
    version: String,
    timestamp: DateTime<Utc>,
    uptime_secs: i64,
    services: ServiceHealth,
}

/// Service health. No API key required.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    responses((status = 200, description = "Health report", body = HealthResponse))
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let storage = state.repo.storage_info().await;
    let storage_status = if !storage.healthy {
        "unhealthy"
    } else if storage.fallback {
        "degraded"
    } else {
        "healthy"
    };
    let degraded = storage_status != "healthy";

    let ai_status = if !state.repo.get_config().await.ai_enabled {
        "disabled"
    } else if state.generator.is_live() {
        "live"
    } else {
        "not_configured"
    };

    let now = Utc::now();
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            status: if degraded { "degraded" } else { "healthy" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: now,
            uptime_secs: (now - state.start_time).num_seconds(),
            services: ServiceHealth {
                storage: storage_status.to_string(),
                ai: ai_status.to_string(),
                datadog: if state.analyzer.source().is_configured() {
                    "configured"
                } else {
                    "synthetic"
                }
                .to_string(),
                scheduler: if state.scheduler.is_running() {
                    "running"
                } else {
                    "stopped"
                }
                .to_string(),
            },
        },
    )
}

/// Weekly job registration and next fire time.
#[utoipa::path(
    get,
    path = "/api/scheduler/status",
    tag = "System",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Scheduler status", body = SchedulerStatus),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn scheduler_status(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.scheduler.status().await)
}

/// Storage backend in use.
#[utoipa::path(
    get,
    path = "/api/storage/info",
    tag = "System",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Storage backend", body = StorageInfo),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn storage_info(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.repo.storage_info().await)
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(root))
        .routes(routes!(health))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(scheduler_status))
        .routes(routes!(storage_info))
}
