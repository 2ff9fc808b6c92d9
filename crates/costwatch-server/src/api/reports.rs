use crate::api::{error_response, not_found, success_response, TriggerResponse};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use costwatch_analysis::summarize;
use costwatch_common::types::{Team, TeamAnalysis};
use costwatch_notify::{AdminReportParams, ReportRenderer};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

fn shutting_down(trace_id: &str) -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        trace_id,
        "unavailable",
        "Server is shutting down",
    )
}

/// Run the full weekly pipeline now, in the background.
#[utoipa::path(
    post,
    path = "/api/trigger/weekly-report",
    tag = "Reports",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Run started", body = TriggerResponse),
        (status = 503, description = "Shutting down", body = crate::api::ApiError)
    )
)]
async fn trigger_weekly_report(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if !state.scheduler.trigger_now() {
        return shutting_down(&trace_id);
    }
    tracing::info!(trace_id = %trace_id.0, "Weekly report triggered manually");
    success_response(
        StatusCode::OK,
        &trace_id,
        TriggerResponse::processing("Weekly report generation triggered"),
    )
}

/// Analyze one team and send its report in the background.
#[utoipa::path(
    post,
    path = "/api/trigger/team-report/{id}",
    tag = "Reports",
    security(("api_key" = [])),
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Run started", body = TriggerResponse),
        (status = 404, description = "No such team", body = crate::api::ApiError)
    )
)]
async fn trigger_team_report(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(team) = state.repo.get_team(&id).await else {
        return not_found(&trace_id, "Team not found");
    };
    let message = format!("Report triggered for team {}", team.team_name);

    let job = state.job.clone();
    let spawned = state.scheduler.spawn(async move {
        if let Err(e) = job.run_team_report(&team).await {
            tracing::error!(team = %team.team_name, error = %format!("{e:#}"), "Team report failed");
        }
    });
    if !spawned {
        return shutting_down(&trace_id);
    }
    success_response(StatusCode::OK, &trace_id, TriggerResponse::processing(message))
}

#[derive(Serialize, ToSchema)]
struct TeamReportPreview {
    team: Team,
    analysis: TeamAnalysis,
    /// Rendered HTML e-mail body.
    email_preview: String,
}

/// Analyze one team and render its e-mail without sending or storing anything.
#[utoipa::path(
    get,
    path = "/api/preview/team-report/{id}",
    tag = "Reports",
    security(("api_key" = [])),
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Analysis and rendered e-mail", body = TeamReportPreview),
        (status = 404, description = "No such team", body = crate::api::ApiError)
    )
)]
async fn preview_team_report(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(team) = state.repo.get_team(&id).await else {
        return not_found(&trace_id, "Team not found");
    };
    let config = state.repo.get_config().await;
    let analysis = match state.analyzer.analyze(&team, config.anomaly_threshold).await {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, team = %team.team_name, error = %e, "Preview analysis failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                &e.to_string(),
            );
        }
    };
    let explanation = state
        .job
        .generator_for(&config)
        .explain_cost_change(&analysis)
        .await;
    let email_preview = ReportRenderer::render_team_report(&analysis, &explanation, Utc::now());
    success_response(
        StatusCode::OK,
        &trace_id,
        TeamReportPreview {
            team,
            analysis,
            email_preview,
        },
    )
}

#[derive(Serialize, ToSchema)]
struct AnomalyPreview {
    team_name: String,
    current_cost: f64,
    percentage_change: f64,
}

#[derive(Serialize, ToSchema)]
struct AdminReportPreview {
    teams_count: usize,
    anomalies_count: usize,
    teams_data: Vec<TeamAnalysis>,
    anomalies: Vec<AnomalyPreview>,
    email_preview: String,
}

/// Analyze every team and render the admin e-mail without sending or storing
/// anything.
#[utoipa::path(
    get,
    path = "/api/preview/admin-report",
    tag = "Reports",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Per-team analyses and rendered e-mail", body = AdminReportPreview),
        (status = 404, description = "No teams configured", body = crate::api::ApiError)
    )
)]
async fn preview_admin_report(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let teams = state.repo.list_teams().await;
    if teams.is_empty() {
        return not_found(&trace_id, "No teams configured");
    }
    let config = state.repo.get_config().await;

    let mut teams_data = Vec::with_capacity(teams.len());
    for team in &teams {
        match state.analyzer.analyze(team, config.anomaly_threshold).await {
            Ok(a) => teams_data.push(a),
            Err(e) => {
                tracing::warn!(team = %team.team_name, error = %e, "Skipping team in admin preview");
            }
        }
    }
    let anomalies: Vec<AnomalyPreview> = teams_data
        .iter()
        .filter(|a| a.is_anomaly)
        .map(|a| AnomalyPreview {
            team_name: a.team_name.clone(),
            current_cost: a.current_month_cost,
            percentage_change: a.percentage_change,
        })
        .collect();

    let org = summarize(&teams_data);
    let email_preview = ReportRenderer::render_admin_report(&AdminReportParams {
        org: &org,
        executive_summary: None,
        recommendations: None,
        generated_at: Utc::now(),
    });
    success_response(
        StatusCode::OK,
        &trace_id,
        AdminReportPreview {
            teams_count: teams.len(),
            anomalies_count: anomalies.len(),
            teams_data,
            anomalies,
            email_preview,
        },
    )
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(trigger_weekly_report))
        .routes(routes!(trigger_team_report))
        .routes(routes!(preview_team_report))
        .routes(routes!(preview_admin_report))
}
