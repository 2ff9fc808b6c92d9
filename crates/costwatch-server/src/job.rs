use anyhow::{Context, Result};
use chrono::Utc;
use costwatch_ai::{InsightGenerator, NullGenerator};
use costwatch_analysis::{cost_anomaly, cost_record, summarize, CostAnalyzer};
use costwatch_common::types::{AIInsight, NotificationConfig, OrgSummary, Team, TeamAnalysis};
use costwatch_notify::{AdminReportParams, Notifier, ReportRenderer};
use costwatch_storage::CostRepository;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Phases of one weekly run, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    #[default]
    Idle,
    LoadingConfig,
    LoadingTeams,
    PerTeamAnalysis,
    Aggregate,
    OrgInsight,
    AdminNotify,
}

/// Outcome of one run. `phase` is the last phase entered before returning
/// to idle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RunSummary {
    pub teams_total: usize,
    pub teams_analyzed: usize,
    pub teams_failed: usize,
    pub anomalies: usize,
    pub team_reports_sent: usize,
    pub admin_notified: bool,
    pub insight_saved: bool,
    pub phase: JobPhase,
}

/// The weekly cost pipeline shared by the scheduler and manual triggers.
pub struct WeeklyJob {
    repo: CostRepository,
    analyzer: Arc<CostAnalyzer>,
    generator: Arc<dyn InsightGenerator>,
    notifier: Arc<dyn Notifier>,
}

impl WeeklyJob {
    pub fn new(
        repo: CostRepository,
        analyzer: Arc<CostAnalyzer>,
        generator: Arc<dyn InsightGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repo,
            analyzer,
            generator,
            notifier,
        }
    }

    /// The configured generator, or the rule-based one when AI is switched
    /// off in the stored config.
    pub fn generator_for(&self, config: &NotificationConfig) -> Arc<dyn InsightGenerator> {
        if config.ai_enabled {
            self.generator.clone()
        } else {
            Arc::new(NullGenerator)
        }
    }

    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        tracing::info!("Weekly cost report started");

        summary.phase = JobPhase::LoadingConfig;
        let config = self.repo.get_config().await;
        let generator = self.generator_for(&config);

        summary.phase = JobPhase::LoadingTeams;
        let teams = self.repo.list_teams().await;
        summary.teams_total = teams.len();
        if teams.is_empty() {
            tracing::warn!("No teams configured, weekly report skipped");
            return summary;
        }

        summary.phase = JobPhase::PerTeamAnalysis;
        let mut analyzed = Vec::with_capacity(teams.len());
        for team in &teams {
            match self.process_team(team, &config, generator.as_ref()).await {
                Ok((analysis, sent)) => {
                    if analysis.is_anomaly {
                        summary.anomalies += 1;
                    }
                    if sent {
                        summary.team_reports_sent += 1;
                    }
                    analyzed.push(analysis);
                }
                Err(e) => {
                    summary.teams_failed += 1;
                    tracing::error!(
                        team = %team.team_name,
                        account_id = %team.aws_account_id,
                        error = %format!("{e:#}"),
                        "Team analysis failed, continuing"
                    );
                }
            }
        }
        summary.teams_analyzed = analyzed.len();
        if analyzed.is_empty() {
            tracing::warn!(
                failed = summary.teams_failed,
                "Every team failed analysis, admin report skipped"
            );
            return summary;
        }

        summary.phase = JobPhase::Aggregate;
        let org = summarize(&analyzed);

        let mut executive_summary = None;
        let mut recommendations = None;
        if config.ai_enabled {
            summary.phase = JobPhase::OrgInsight;
            let exec = generator.executive_summary(&org).await;
            let recs = generator.recommendations(&org).await;
            summary.insight_saved = self.save_insight(&org, &exec, &recs).await;
            executive_summary = Some(exec);
            recommendations = Some(recs);
        }

        summary.phase = JobPhase::AdminNotify;
        summary.admin_notified = self
            .notify_admins(
                &config,
                &org,
                executive_summary.as_deref(),
                recommendations.as_deref(),
            )
            .await;

        tracing::info!(
            teams = summary.teams_total,
            analyzed = summary.teams_analyzed,
            failed = summary.teams_failed,
            anomalies = summary.anomalies,
            admin_notified = summary.admin_notified,
            "Weekly cost report finished"
        );
        summary
    }

    /// Analyze, persist, and alert for one team.
    ///
    /// Returns the analysis and whether a team report was sent.
    async fn process_team(
        &self,
        team: &Team,
        config: &NotificationConfig,
        generator: &dyn InsightGenerator,
    ) -> Result<(TeamAnalysis, bool)> {
        let analysis = self
            .analyzer
            .analyze(team, config.anomaly_threshold)
            .await?;
        let explanation = generator.explain_cost_change(&analysis).await;

        self.repo
            .save_cost_record(&cost_record(&analysis, Some(explanation.clone())))
            .await
            .context("failed to save cost record")?;

        let mut sent = false;
        if analysis.is_anomaly {
            self.repo
                .save_anomaly(&cost_anomaly(&analysis, Some(explanation.clone())))
                .await
                .context("failed to save anomaly")?;
            sent = self.send_team_report(team, &analysis, &explanation).await;
        }
        Ok((analysis, sent))
    }

    /// Analyze one team and send its report regardless of anomaly status.
    /// Nothing is persisted.
    pub async fn run_team_report(&self, team: &Team) -> Result<TeamAnalysis> {
        let config = self.repo.get_config().await;
        let generator = self.generator_for(&config);
        let analysis = self
            .analyzer
            .analyze(team, config.anomaly_threshold)
            .await?;
        let explanation = generator.explain_cost_change(&analysis).await;
        self.send_team_report(team, &analysis, &explanation).await;
        Ok(analysis)
    }

    async fn send_team_report(&self, team: &Team, analysis: &TeamAnalysis, explanation: &str) -> bool {
        let subject = ReportRenderer::team_subject(&team.team_name);
        let html = ReportRenderer::render_team_report(analysis, explanation, Utc::now());
        match self.notifier.send(&team.recipients(), &subject, &html).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(team = %team.team_name, error = %e, "Failed to send team report");
                false
            }
        }
    }

    async fn save_insight(&self, org: &OrgSummary, exec: &str, recs: &str) -> bool {
        let insight = AIInsight {
            id: costwatch_common::id::next_id(),
            insight_type: "weekly_summary".to_string(),
            executive_summary: exec.to_string(),
            recommendations: recs.to_string(),
            teams_analyzed: org.accounts,
            anomalies_detected: org.anomalies_count,
            generated_at: Utc::now(),
        };
        match self.repo.save_insight(&insight).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to save weekly insight");
                false
            }
        }
    }

    async fn notify_admins(
        &self,
        config: &NotificationConfig,
        org: &OrgSummary,
        executive_summary: Option<&str>,
        recommendations: Option<&str>,
    ) -> bool {
        if config.global_admin_emails.is_empty() {
            tracing::warn!("No admin e-mails configured, admin report skipped");
            return false;
        }
        if !self.notifier.is_configured() {
            tracing::warn!(notifier = self.notifier.name(), "Notifier not configured, admin report skipped");
            return false;
        }

        let now = Utc::now();
        let html = ReportRenderer::render_admin_report(&AdminReportParams {
            org,
            executive_summary,
            recommendations,
            generated_at: now,
        });
        let subject = ReportRenderer::admin_subject(now);
        match self
            .notifier
            .send(&config.global_admin_emails, &subject, &html)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to send admin report");
                false
            }
        }
    }
}
