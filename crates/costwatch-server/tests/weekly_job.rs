mod common;

use common::{build_test_context, build_test_context_with, team, ScriptedMetrics};
use costwatch_ai::NullGenerator;
use costwatch_common::types::UpdateConfigRequest;
use costwatch_server::job::JobPhase;
use std::sync::Arc;

async fn set_admins(ctx: &common::TestContext, ai_enabled: bool) {
    ctx.state
        .repo
        .update_config(&UpdateConfigRequest {
            global_admin_emails: Some(vec!["ops@example.com".to_string()]),
            ai_enabled: Some(ai_enabled),
            ..Default::default()
        })
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn anomalous_team_gets_record_anomaly_and_email() {
    let metrics = ScriptedMetrics::new().with("111111111111", 13000.0, 10000.0);
    let ctx = build_test_context_with(metrics, Arc::new(NullGenerator))
        .await
        .unwrap();
    set_admins(&ctx, true).await;
    ctx.state
        .repo
        .add_team(team("Payments", "111111111111"))
        .await
        .unwrap();

    let summary = ctx.state.job.run().await;
    assert_eq!(summary.teams_total, 1);
    assert_eq!(summary.teams_analyzed, 1);
    assert_eq!(summary.anomalies, 1);
    assert_eq!(summary.team_reports_sent, 1);
    assert!(summary.admin_notified);
    assert!(summary.insight_saved);
    assert_eq!(summary.phase, JobPhase::AdminNotify);

    let records = ctx.state.repo.cost_history(None, None, 100).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total_cost, 13000.0);
    assert!(records[0]
        .ai_analysis
        .as_deref()
        .unwrap()
        .starts_with("Cost increased by 30.0%."));

    let anomalies = ctx.state.repo.anomalies(None, 50).await;
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].percentage_change, 30.0);
    assert_eq!(anomalies[0].previous_cost, 10000.0);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].subject, "🚨 AWS Cost Anomaly Detected - Payments");
    assert_eq!(sent[0].recipients, vec!["payments@example.com"]);
    assert!(sent[0].html.contains("$13,000.00"));
    assert!(sent[1].subject.starts_with("AWS Cost Weekly Report - "));
    assert_eq!(sent[1].recipients, vec!["ops@example.com"]);
    assert!(sent[1].html.contains("Cost Anomalies (1 detected)"));

    let insights = ctx.state.repo.insights(10).await;
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].insight_type, "weekly_summary");
    assert_eq!(insights[0].teams_analyzed, 1);
    assert_eq!(insights[0].anomalies_detected, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn normal_team_is_recorded_without_alert() {
    let metrics = ScriptedMetrics::new().with("222222222222", 10500.0, 10000.0);
    let ctx = build_test_context_with(metrics, Arc::new(NullGenerator))
        .await
        .unwrap();
    ctx.state
        .repo
        .add_team(team("Search", "222222222222"))
        .await
        .unwrap();

    let summary = ctx.state.job.run().await;
    assert_eq!(summary.anomalies, 0);
    assert_eq!(summary.team_reports_sent, 0);
    // No admin e-mails configured.
    assert!(!summary.admin_notified);

    assert_eq!(
        ctx.state
            .repo
            .cost_history(None, None, 100)
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(ctx.state.repo.anomalies(None, 50).await.is_empty());
    assert!(ctx.notifier.sent().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn no_teams_means_no_work() {
    let ctx = build_test_context().await.unwrap();
    set_admins(&ctx, true).await;

    let summary = ctx.state.job.run().await;
    assert_eq!(summary.teams_total, 0);
    assert_eq!(summary.phase, JobPhase::LoadingTeams);
    assert!(!summary.admin_notified);
    assert!(!summary.insight_saved);

    assert!(ctx.notifier.sent().is_empty());
    assert!(ctx
        .state
        .repo
        .cost_history(None, None, 100)
        .await
        .unwrap()
        .is_empty());
    assert!(ctx.state.repo.insights(10).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn one_failing_team_does_not_stop_the_others() {
    let metrics = ScriptedMetrics::new()
        .with("111111111111", 13000.0, 10000.0)
        .failing("222222222222")
        .with("333333333333", 5000.0, 5000.0);
    let ctx = build_test_context_with(metrics, Arc::new(NullGenerator))
        .await
        .unwrap();
    set_admins(&ctx, false).await;
    for (name, account) in [
        ("Payments", "111111111111"),
        ("Broken", "222222222222"),
        ("Search", "333333333333"),
    ] {
        ctx.state.repo.add_team(team(name, account)).await.unwrap();
    }

    let summary = ctx.state.job.run().await;
    assert_eq!(summary.teams_total, 3);
    assert_eq!(summary.teams_analyzed, 2);
    assert_eq!(summary.teams_failed, 1);
    assert_eq!(summary.anomalies, 1);
    assert!(summary.admin_notified);
    // AI switched off in the stored config: no insight phase.
    assert!(!summary.insight_saved);

    let records = ctx.state.repo.cost_history(None, None, 100).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.team_name != "Broken"));

    let sent = ctx.notifier.sent();
    let admin = sent
        .iter()
        .find(|m| m.subject.starts_with("AWS Cost Weekly Report"))
        .unwrap();
    // Totals cover only the two successful teams.
    assert!(admin.html.contains("$18,000.00"));
    assert!(admin.html.contains("$15,000.00"));
    assert!(!admin.html.contains("Broken"));
    assert!(admin.html.contains("AI analysis not available"));
}

#[tokio::test(flavor = "multi_thread")]
async fn all_teams_failing_skips_admin_report() {
    let metrics = ScriptedMetrics::new()
        .failing("111111111111")
        .failing("222222222222");
    let ctx = build_test_context_with(metrics, Arc::new(NullGenerator))
        .await
        .unwrap();
    set_admins(&ctx, true).await;
    ctx.state
        .repo
        .add_team(team("Payments", "111111111111"))
        .await
        .unwrap();
    ctx.state
        .repo
        .add_team(team("Search", "222222222222"))
        .await
        .unwrap();

    let summary = ctx.state.job.run().await;
    assert_eq!(summary.teams_failed, 2);
    assert_eq!(summary.teams_analyzed, 0);
    assert!(!summary.admin_notified);
    assert!(!summary.insight_saved);
    assert_eq!(summary.phase, JobPhase::PerTeamAnalysis);
    assert!(ctx.notifier.sent().is_empty());
    assert!(ctx.state.repo.insights(10).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_runs_append_to_the_same_bucket() {
    let metrics = ScriptedMetrics::new().with("111111111111", 13000.0, 10000.0);
    let ctx = build_test_context_with(metrics, Arc::new(NullGenerator))
        .await
        .unwrap();
    ctx.state
        .repo
        .add_team(team("Payments", "111111111111"))
        .await
        .unwrap();

    for _ in 0..3 {
        ctx.state.job.run().await;
    }
    assert_eq!(
        ctx.state
            .repo
            .cost_history(Some("Payments"), None, 100)
            .await
            .unwrap()
            .len(),
        3
    );
    assert_eq!(ctx.state.repo.anomalies(Some("Payments"), 50).await.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_team_report_sends_without_persisting() {
    let ctx = build_test_context().await.unwrap();
    let t = team("Payments", "111111111111");
    ctx.state.repo.add_team(t.clone()).await.unwrap();

    let analysis = ctx.state.job.run_team_report(&t).await.unwrap();
    assert!(!analysis.is_anomaly);
    assert_eq!(ctx.notifier.sent().len(), 1);
    assert!(ctx
        .state
        .repo
        .cost_history(None, None, 100)
        .await
        .unwrap()
        .is_empty());
}
