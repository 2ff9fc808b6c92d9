use crate::api::limits::{self, deserialize_optional_u64};
use crate::api::{storage_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use costwatch_common::types::{CostAnomaly, CostRecord};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct CostHistoryParams {
    /// Exact team name.
    team_name: Option<String>,
    /// `YYYY-MM`.
    month: Option<String>,
    /// Default 100, max 1000.
    #[param(required = false, value_type = Option<u64>)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    limit: Option<u64>,
}

/// Stored cost records, most recent first.
#[utoipa::path(
    get,
    path = "/api/costs/history",
    tag = "History",
    security(("api_key" = [])),
    params(CostHistoryParams),
    responses(
        (status = 200, description = "Cost records", body = Vec<CostRecord>),
        (status = 400, description = "Invalid month", body = crate::api::ApiError)
    )
)]
async fn cost_history(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<CostHistoryParams>,
) -> impl IntoResponse {
    let limit = limits::COST_HISTORY.apply(params.limit);
    let team = params.team_name.as_deref().filter(|s| !s.is_empty());
    let month = params.month.as_deref().filter(|s| !s.is_empty());
    match state.repo.cost_history(team, month, limit).await {
        Ok(records) => success_response(StatusCode::OK, &trace_id, records),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct AnomalyParams {
    team_name: Option<String>,
    /// Default 50, max 500.
    #[param(required = false, value_type = Option<u64>)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    limit: Option<u64>,
}

/// Detected anomalies, most recent first.
#[utoipa::path(
    get,
    path = "/api/anomalies",
    tag = "History",
    security(("api_key" = [])),
    params(AnomalyParams),
    responses(
        (status = 200, description = "Anomalies", body = Vec<CostAnomaly>),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn anomalies(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<AnomalyParams>,
) -> impl IntoResponse {
    let limit = limits::ANOMALIES.apply(params.limit);
    let team = params.team_name.as_deref().filter(|s| !s.is_empty());
    success_response(
        StatusCode::OK,
        &trace_id,
        state.repo.anomalies(team, limit).await,
    )
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(cost_history))
        .routes(routes!(anomalies))
}
