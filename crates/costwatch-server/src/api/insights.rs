use crate::api::limits::{self, deserialize_optional_u64};
use crate::api::{error_response, not_found, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use costwatch_ai::Prediction;
use costwatch_analysis::summarize;
use costwatch_common::types::{AIInsight, TeamAnalysis};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct InsightParams {
    /// Default 20, max 100.
    #[param(required = false, value_type = Option<u64>)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    limit: Option<u64>,
}

/// Stored weekly insights, most recent first.
#[utoipa::path(
    get,
    path = "/api/ai/insights",
    tag = "Insights",
    security(("api_key" = [])),
    params(InsightParams),
    responses(
        (status = 200, description = "Insights", body = Vec<AIInsight>),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn list_insights(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<InsightParams>,
) -> impl IntoResponse {
    let limit = limits::INSIGHTS.apply(params.limit);
    success_response(StatusCode::OK, &trace_id, state.repo.insights(limit).await)
}

#[derive(Serialize, ToSchema)]
struct RecommendationsResponse {
    recommendations: String,
    teams_analyzed: usize,
    provider: String,
    generated_at: DateTime<Utc>,
}

/// Fresh org-wide recommendations from a new analysis of every team.
#[utoipa::path(
    get,
    path = "/api/ai/recommendations",
    tag = "Insights",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Recommendations", body = RecommendationsResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::api::ApiError)
    )
)]
async fn recommendations(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let config = state.repo.get_config().await;
    let teams = state.repo.list_teams().await;

    let mut analyzed = Vec::with_capacity(teams.len());
    for team in &teams {
        match state.analyzer.analyze(team, config.anomaly_threshold).await {
            Ok(a) => analyzed.push(a),
            Err(e) => {
                tracing::warn!(team = %team.team_name, error = %e, "Skipping team in recommendations");
            }
        }
    }
    let org = summarize(&analyzed);
    let generator = state.job.generator_for(&config);
    let text = generator.recommendations(&org).await;
    success_response(
        StatusCode::OK,
        &trace_id,
        RecommendationsResponse {
            recommendations: text,
            teams_analyzed: org.accounts,
            provider: generator.provider().to_string(),
            generated_at: Utc::now(),
        },
    )
}

#[derive(Serialize, ToSchema)]
struct TeamInsightResponse {
    team_name: String,
    analysis: TeamAnalysis,
    ai_analysis: String,
    prediction: Prediction,
}

/// Analysis, explanation, and next-month forecast for one team.
#[utoipa::path(
    post,
    path = "/api/ai/analyze/{team_id}",
    tag = "Insights",
    security(("api_key" = [])),
    params(("team_id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Team insight", body = TeamInsightResponse),
        (status = 404, description = "No such team", body = crate::api::ApiError)
    )
)]
async fn analyze_team(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> impl IntoResponse {
    let Some(team) = state.repo.get_team(&team_id).await else {
        return not_found(&trace_id, "Team not found");
    };
    let config = state.repo.get_config().await;
    let analysis = match state.analyzer.analyze(&team, config.anomaly_threshold).await {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, team = %team.team_name, error = %e, "Team analysis failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                &e.to_string(),
            );
        }
    };

    let generator = state.job.generator_for(&config);
    let ai_analysis = generator.explain_cost_change(&analysis).await;
    let history = state.repo.team_cost_history(&team.aws_account_id).await;
    let prediction = generator
        .predict_next_month(&history, &team.team_name)
        .await;

    success_response(
        StatusCode::OK,
        &trace_id,
        TeamInsightResponse {
            team_name: team.team_name,
            analysis,
            ai_analysis,
            prediction,
        },
    )
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_insights))
        .routes(routes!(recommendations))
        .routes(routes!(analyze_team))
}
