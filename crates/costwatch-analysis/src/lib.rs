//! Month-over-month cost analysis.
//!
//! [`CostAnalyzer::analyze`] fetches the current and previous calendar month
//! for one team and applies the anomaly policy in [`policy`]. The helpers in
//! [`aggregate`] roll many team results up into an [`OrgSummary`].

pub mod aggregate;
pub mod error;
pub mod policy;
pub mod window;

use chrono::{DateTime, Utc};
use costwatch_common::types::{round2, CostAnomaly, CostRecord, Team, TeamAnalysis};
use costwatch_metrics::MetricsSource;
use std::sync::Arc;

pub use aggregate::{summarize, top_anomalies, top_spenders};
pub use costwatch_common::types::OrgSummary;
pub use error::{AnalysisError, Result};
pub use window::{month_windows, MonthWindows};

pub struct CostAnalyzer {
    source: Arc<dyn MetricsSource>,
}

impl CostAnalyzer {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn MetricsSource> {
        &self.source
    }

    /// Compares this calendar month so far against the whole previous month.
    pub async fn analyze(&self, team: &Team, threshold: f64) -> Result<TeamAnalysis> {
        self.analyze_at(team, threshold, Utc::now()).await
    }

    /// [`analyze`](Self::analyze) with an explicit clock.
    pub async fn analyze_at(
        &self,
        team: &Team,
        threshold: f64,
        now: DateTime<Utc>,
    ) -> Result<TeamAnalysis> {
        let account_id = team.aws_account_id.as_str();
        if account_id.is_empty() {
            return Err(AnalysisError::InvalidTeam(format!(
                "team '{}' has no aws_account_id",
                team.team_name
            )));
        }

        let windows = month_windows(now);
        let metrics_err = |source: costwatch_metrics::MetricsError| AnalysisError::Metrics {
            account_id: account_id.to_string(),
            source,
        };
        let current = self
            .source
            .fetch(account_id, windows.current_start, windows.current_end)
            .await
            .map_err(metrics_err)?;
        let previous = self
            .source
            .fetch(account_id, windows.previous_start, windows.previous_end)
            .await
            .map_err(metrics_err)?;

        let change = policy::percentage_change(current.total_cost, previous.total_cost);
        let anomaly = policy::is_anomaly(change, threshold);

        tracing::info!(
            team = %team.team_name,
            account_id = %account_id,
            current = current.total_cost,
            previous = previous.total_cost,
            change = round2(change),
            anomaly,
            "Analyzed team cost"
        );

        Ok(TeamAnalysis {
            team_name: team.team_name.clone(),
            aws_account_id: team.aws_account_id.clone(),
            team_email: team.team_email.clone(),
            current_month: windows.current_month(),
            current_month_cost: current.total_cost,
            previous_month: windows.previous_month(),
            previous_month_cost: previous.total_cost,
            percentage_change: round2(change),
            is_anomaly: anomaly,
            synthetic: current.is_synthetic() || previous.is_synthetic(),
            service_breakdown: current.service_breakdown,
            previous_service_breakdown: previous.service_breakdown,
        })
    }
}

/// History entry for the current month of `analysis`.
pub fn cost_record(analysis: &TeamAnalysis, ai_analysis: Option<String>) -> CostRecord {
    CostRecord {
        id: costwatch_common::id::next_id(),
        aws_account_id: analysis.aws_account_id.clone(),
        team_name: analysis.team_name.clone(),
        month: analysis.current_month.clone(),
        total_cost: analysis.current_month_cost,
        service_breakdown: analysis.service_breakdown.clone(),
        ai_analysis,
        fetched_at: Utc::now(),
    }
}

pub fn cost_anomaly(analysis: &TeamAnalysis, explanation: Option<String>) -> CostAnomaly {
    CostAnomaly {
        id: costwatch_common::id::next_id(),
        aws_account_id: analysis.aws_account_id.clone(),
        team_name: analysis.team_name.clone(),
        current_month: analysis.current_month.clone(),
        current_cost: analysis.current_month_cost,
        previous_month: analysis.previous_month.clone(),
        previous_cost: analysis.previous_month_cost,
        percentage_change: analysis.percentage_change,
        is_anomaly: true,
        ai_explanation: explanation,
        detected_at: Utc::now(),
    }
}
