use crate::keys;
use crate::local::LocalFileStore;
use crate::repository::CostRepository;
use crate::{connect, DocumentStore, StorageError, StorageSettings};
use chrono::{Duration, Utc};
use costwatch_common::types::{
    AIInsight, ConfigUpdateError, CostAnomaly, CostRecord, CreateTeamRequest, NotificationConfig,
    ScheduleDay, Team, UpdateConfigRequest,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup() -> (TempDir, Arc<LocalFileStore>, CostRepository) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(LocalFileStore::open(dir.path()).await.unwrap());
    let repo = CostRepository::new(store.clone(), NotificationConfig::default());
    (dir, store, repo)
}

fn make_team(name: &str, account: &str) -> Team {
    Team::from_request(CreateTeamRequest {
        team_name: name.to_string(),
        aws_account_id: account.to_string(),
        team_email: format!("{}@example.com", name.to_lowercase()),
        admin_emails: Vec::new(),
    })
}

fn make_record(team: &str, account: &str, month: &str, total: f64, mins_ago: i64) -> CostRecord {
    CostRecord {
        id: costwatch_common::id::next_id(),
        aws_account_id: account.to_string(),
        team_name: team.to_string(),
        month: month.to_string(),
        total_cost: total,
        service_breakdown: [("EC2".to_string(), total)].into_iter().collect(),
        ai_analysis: None,
        fetched_at: Utc::now() - Duration::minutes(mins_ago),
    }
}

fn make_anomaly(team: &str, month: &str, pct: f64, mins_ago: i64) -> CostAnomaly {
    CostAnomaly {
        id: costwatch_common::id::next_id(),
        aws_account_id: format!("acct-{team}"),
        team_name: team.to_string(),
        current_month: month.to_string(),
        current_cost: 1300.0,
        previous_month: "2024-02".to_string(),
        previous_cost: 1000.0,
        percentage_change: pct,
        is_anomaly: true,
        ai_explanation: Some("EC2 grew".to_string()),
        detected_at: Utc::now() - Duration::minutes(mins_ago),
    }
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let (dir, store, _repo) = setup().await;
    let doc = json!({"a": 1, "nested": {"b": [1, 2, 3]}});

    store.write("teams/teams.json", &doc).await.unwrap();
    assert_eq!(store.read("teams/teams.json").await.unwrap(), Some(doc));
    assert_eq!(store.read("teams/missing.json").await.unwrap(), None);

    // Pretty-printed with two-space indentation.
    let raw = std::fs::read_to_string(dir.path().join("teams/teams.json")).unwrap();
    assert!(raw.contains("\n  \"a\": 1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_writes_to_one_key_all_succeed() {
    let (dir, store, _repo) = setup().await;
    let key = "anomalies/2024/03/anomalies.json";
    store.write(key, &json!({"writer": -1})).await.unwrap();

    for round in 0..50 {
        let mut tasks = Vec::new();
        for writer in 0..4 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .write(key, &json!({"round": round, "writer": writer, "pad": "x".repeat(4096)}))
                    .await
            }));
        }
        let reader = {
            let store = store.clone();
            tokio::spawn(async move { store.read(key).await })
        };
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(reader.await.unwrap().unwrap().is_some());
    }

    let doc = store.read(key).await.unwrap().unwrap();
    assert_eq!(doc["round"], 49);
    // No temp files are left next to the document.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("anomalies/2024/03"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("anomalies.json")]);
}

#[tokio::test]
async fn list_filters_by_prefix_and_sorts() {
    let (_dir, store, _repo) = setup().await;
    for key in [
        "costs/2024/03/222.json",
        "costs/2024/03/111.json",
        "costs/2024/04/111.json",
        "anomalies/2024/03/anomalies.json",
    ] {
        store.write(key, &json!({})).await.unwrap();
    }

    assert_eq!(
        store.list("costs/2024/03/").await,
        vec!["costs/2024/03/111.json", "costs/2024/03/222.json"]
    );
    assert_eq!(store.list("costs/").await.len(), 3);
    assert!(store.list("ai_insights/").await.is_empty());
}

#[tokio::test]
async fn delete_reports_whether_key_existed() {
    let (_dir, store, _repo) = setup().await;
    store.write("teams/teams.json", &json!({})).await.unwrap();
    assert!(store.delete("teams/teams.json").await);
    assert!(!store.delete("teams/teams.json").await);
}

#[tokio::test]
async fn invalid_key_soft_fails() {
    let (_dir, store, _repo) = setup().await;
    assert!(matches!(
        store.read("../outside.json").await,
        Err(StorageError::InvalidKey(_))
    ));
    assert_eq!(store.get("../outside.json").await, None);
    assert!(!store.put("/abs.json", &json!({})).await);
}

#[tokio::test]
async fn config_is_created_once_with_defaults() {
    let (_dir, store, repo) = setup().await;
    assert!(store.get(keys::CONFIG_KEY).await.is_none());

    let first = repo.get_config().await;
    assert_eq!(first.anomaly_threshold, 20.0);
    assert_eq!(first.schedule_day, ScheduleDay::Monday);
    assert_eq!(first.schedule_hour, 9);
    assert!(store.get(keys::CONFIG_KEY).await.is_some());

    let second = repo.get_config().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn corrupt_config_falls_back_without_overwrite() {
    let (_dir, store, repo) = setup().await;
    let garbage = json!({"anomaly_threshold": "lots"});
    store.write(keys::CONFIG_KEY, &garbage).await.unwrap();

    let config = repo.get_config().await;
    assert_eq!(config.anomaly_threshold, 20.0);
    assert_eq!(store.get(keys::CONFIG_KEY).await, Some(garbage));
}

#[tokio::test]
async fn save_config_persists_changes() {
    let (_dir, _store, repo) = setup().await;
    let mut config = repo.get_config().await;
    config.schedule_day = ScheduleDay::Friday;
    config.schedule_hour = 17;
    repo.save_config(&config).await.unwrap();

    let reloaded = repo.get_config().await;
    assert_eq!(reloaded.schedule_day, ScheduleDay::Friday);
    assert_eq!(reloaded.schedule_hour, 17);
}

#[tokio::test]
async fn update_config_validates_before_writing() {
    let (_dir, _store, repo) = setup().await;
    let bad = UpdateConfigRequest {
        anomaly_threshold: Some(10.0),
        schedule_day: Some("noday".to_string()),
        ..Default::default()
    };
    let err = repo.update_config(&bad).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::InvalidConfig(ConfigUpdateError::InvalidSchedule(_))
    ));
    assert_eq!(repo.get_config().await.anomaly_threshold, 20.0);

    let good = UpdateConfigRequest {
        schedule_hour: Some(6),
        ..Default::default()
    };
    let (config, changed) = repo.update_config(&good).await.unwrap();
    assert!(changed);
    assert_eq!(config.schedule_hour, 6);
    assert_eq!(repo.get_config().await.schedule_hour, 6);
}

#[tokio::test]
async fn duplicate_account_is_rejected() {
    let (_dir, _store, repo) = setup().await;
    repo.add_team(make_team("Payments", "111111111111"))
        .await
        .unwrap();

    let err = repo
        .add_team(make_team("Other", "111111111111"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateAccount(_)));

    let teams = repo.list_teams().await;
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].team_name, "Payments");
}

#[tokio::test]
async fn bulk_add_skips_existing_and_repeated_accounts() {
    let (_dir, _store, repo) = setup().await;
    repo.add_team(make_team("Payments", "111")).await.unwrap();

    let outcome = repo
        .add_teams_bulk(vec![
            make_team("Search", "222"),
            make_team("Dup", "111"),
            make_team("Search2", "222"),
            make_team("Data", "333"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.created.len(), 2);
    assert_eq!(outcome.skipped, vec!["111", "222"]);
    assert_eq!(repo.list_teams().await.len(), 3);
}

#[tokio::test]
async fn get_and_delete_team() {
    let (_dir, _store, repo) = setup().await;
    let team = repo.add_team(make_team("Payments", "111")).await.unwrap();

    assert_eq!(repo.get_team(&team.id).await, Some(team.clone()));
    assert!(repo.get_team("nope").await.is_none());

    assert!(repo.delete_team(&team.id).await.unwrap());
    assert!(!repo.delete_team(&team.id).await.unwrap());
    assert!(repo.list_teams().await.is_empty());
}

#[tokio::test]
async fn cost_records_accumulate_in_bucket() {
    let (_dir, store, repo) = setup().await;
    for i in 0..4 {
        repo.save_cost_record(&make_record("Payments", "111", "2024-03", 100.0 * i as f64, i))
            .await
            .unwrap();
    }

    let bucket = store.get("costs/2024/03/111.json").await.unwrap();
    assert_eq!(bucket["records"].as_array().unwrap().len(), 4);
    assert_eq!(bucket["aws_account_id"], "111");
    assert_eq!(bucket["month"], "2024-03");
    assert!(bucket["last_updated"].is_string());
}

#[tokio::test]
async fn cost_history_sorts_filters_and_limits() {
    let (_dir, _store, repo) = setup().await;
    repo.save_cost_record(&make_record("Payments", "111", "2024-03", 1.0, 30))
        .await
        .unwrap();
    repo.save_cost_record(&make_record("Payments", "111", "2024-04", 2.0, 10))
        .await
        .unwrap();
    repo.save_cost_record(&make_record("Search", "222", "2024-03", 3.0, 20))
        .await
        .unwrap();

    let all = repo.cost_history(None, None, 100).await.unwrap();
    let totals: Vec<f64> = all.iter().map(|r| r.total_cost).collect();
    assert_eq!(totals, vec![2.0, 3.0, 1.0]);

    let payments = repo.cost_history(Some("Payments"), None, 100).await.unwrap();
    assert_eq!(payments.len(), 2);

    let march = repo.cost_history(None, Some("2024-03"), 100).await.unwrap();
    assert_eq!(march.len(), 2);

    let limited = repo.cost_history(None, None, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].total_cost, 2.0);

    assert!(matches!(
        repo.cost_history(None, Some("March"), 10).await,
        Err(StorageError::InvalidMonth(_))
    ));
}

#[tokio::test]
async fn team_cost_history_keeps_latest_per_month() {
    let (_dir, _store, repo) = setup().await;
    repo.save_cost_record(&make_record("Payments", "111", "2024-02", 900.0, 60))
        .await
        .unwrap();
    repo.save_cost_record(&make_record("Payments", "111", "2024-03", 1000.0, 30))
        .await
        .unwrap();
    repo.save_cost_record(&make_record("Payments", "111", "2024-03", 1100.0, 5))
        .await
        .unwrap();
    repo.save_cost_record(&make_record("Search", "1111", "2024-03", 7.0, 5))
        .await
        .unwrap();

    let totals = repo.team_cost_history("111").await;
    assert_eq!(
        totals,
        vec![("2024-02".to_string(), 900.0), ("2024-03".to_string(), 1100.0)]
    );
}

#[tokio::test]
async fn anomalies_newest_first_with_team_filter() {
    let (_dir, _store, repo) = setup().await;
    repo.save_anomaly(&make_anomaly("Payments", "2024-03", 30.0, 50))
        .await
        .unwrap();
    repo.save_anomaly(&make_anomaly("Search", "2024-03", 45.0, 5))
        .await
        .unwrap();
    repo.save_anomaly(&make_anomaly("Payments", "2024-04", 25.0, 1))
        .await
        .unwrap();

    let all = repo.anomalies(None, 50).await;
    let pcts: Vec<f64> = all.iter().map(|a| a.percentage_change).collect();
    assert_eq!(pcts, vec![25.0, 45.0, 30.0]);

    let payments = repo.anomalies(Some("Payments"), 50).await;
    assert_eq!(payments.len(), 2);
    assert!(payments.iter().all(|a| a.team_name == "Payments"));

    assert_eq!(repo.anomalies(None, 1).await.len(), 1);
}

#[tokio::test]
async fn insights_stored_under_generation_month() {
    let (_dir, store, repo) = setup().await;
    let generated_at = Utc::now();
    let insight = AIInsight {
        id: costwatch_common::id::next_id(),
        insight_type: "weekly_summary".to_string(),
        executive_summary: "Spend is flat".to_string(),
        recommendations: "Buy savings plans".to_string(),
        teams_analyzed: 4,
        anomalies_detected: 1,
        generated_at,
    };
    repo.save_insight(&insight).await.unwrap();

    let key = keys::insights_key(&generated_at.format("%Y-%m").to_string()).unwrap();
    assert!(store.get(&key).await.is_some());
    assert_eq!(repo.insights(20).await, vec![insight]);
}

#[tokio::test]
async fn connect_uses_local_store_when_remote_not_preferred() {
    let dir = TempDir::new().unwrap();
    let settings = StorageSettings {
        bucket: "unused".to_string(),
        region: "us-east-1".to_string(),
        local_dir: dir.path().join("data"),
        prefer_remote: false,
        connect_timeout: std::time::Duration::from_secs(1),
    };
    let store = connect(&settings).await.unwrap();
    let info = store.info();
    assert_eq!(info.backend, "local");
    assert!(!info.fallback);
    assert!(info.healthy);
    assert!(dir.path().join("data").is_dir());
}

#[tokio::test]
async fn fallback_flag_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = LocalFileStore::open(dir.path())
        .await
        .unwrap()
        .with_fallback(true);
    let repo = CostRepository::new(Arc::new(store), NotificationConfig::default());
    let info = repo.storage_info().await;
    assert!(info.fallback);
    assert!(info.healthy);
}
