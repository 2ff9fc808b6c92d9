use crate::api::{error_response, not_found, storage_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use costwatch_common::types::{CreateTeamRequest, Team};
use costwatch_storage::BulkOutcome;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Serialize, ToSchema)]
struct DeletedTeam {
    id: String,
}

/// Register a team. The AWS account id must not already be registered.
#[utoipa::path(
    post,
    path = "/api/teams",
    tag = "Teams",
    security(("api_key" = [])),
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team registered", body = Team),
        (status = 400, description = "Invalid input or duplicate account", body = crate::api::ApiError),
        (status = 500, description = "Storage write failed", body = crate::api::ApiError)
    )
)]
async fn create_team(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateTeamRequest>,
) -> impl IntoResponse {
    if let Err(msg) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg);
    }
    match state.repo.add_team(Team::from_request(req)).await {
        Ok(team) => {
            tracing::info!(team = %team.team_name, account_id = %team.aws_account_id, "Team registered");
            success_response(StatusCode::CREATED, &trace_id, team)
        }
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Register many teams. Accounts already registered, or repeated within the
/// batch, are skipped and reported.
#[utoipa::path(
    post,
    path = "/api/teams/bulk",
    tag = "Teams",
    security(("api_key" = [])),
    request_body = Vec<CreateTeamRequest>,
    responses(
        (status = 200, description = "Created teams and skipped account ids", body = BulkOutcome),
        (status = 400, description = "Invalid entry", body = crate::api::ApiError)
    )
)]
async fn create_teams_bulk(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(reqs): Json<Vec<CreateTeamRequest>>,
) -> impl IntoResponse {
    if reqs.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", "empty batch");
    }
    for (i, req) in reqs.iter().enumerate() {
        if let Err(msg) = req.validate() {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                &format!("entry {i}: {msg}"),
            );
        }
    }
    let teams = reqs.into_iter().map(Team::from_request).collect();
    match state.repo.add_teams_bulk(teams).await {
        Ok(outcome) => {
            tracing::info!(
                created = outcome.created.len(),
                skipped = outcome.skipped.len(),
                "Bulk team registration"
            );
            success_response(StatusCode::OK, &trace_id, outcome)
        }
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// All registered teams.
#[utoipa::path(
    get,
    path = "/api/teams",
    tag = "Teams",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Teams", body = Vec<Team>),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn list_teams(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.repo.list_teams().await)
}

#[utoipa::path(
    get,
    path = "/api/teams/{id}",
    tag = "Teams",
    security(("api_key" = [])),
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Team", body = Team),
        (status = 404, description = "No such team", body = crate::api::ApiError)
    )
)]
async fn get_team(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.repo.get_team(&id).await {
        Some(team) => success_response(StatusCode::OK, &trace_id, team),
        None => not_found(&trace_id, "Team not found"),
    }
}

#[utoipa::path(
    delete,
    path = "/api/teams/{id}",
    tag = "Teams",
    security(("api_key" = [])),
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Team removed", body = DeletedTeam),
        (status = 404, description = "No such team", body = crate::api::ApiError)
    )
)]
async fn delete_team(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.repo.delete_team(&id).await {
        Ok(true) => {
            tracing::info!(team_id = %id, "Team deleted");
            success_response(StatusCode::OK, &trace_id, DeletedTeam { id })
        }
        Ok(false) => not_found(&trace_id, "Team not found"),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_team, list_teams))
        .routes(routes!(create_teams_bulk))
        .routes(routes!(get_team, delete_team))
}
