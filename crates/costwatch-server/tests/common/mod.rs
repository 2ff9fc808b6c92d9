#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{NaiveDate, Utc};
use costwatch_ai::{InsightGenerator, NullGenerator};
use costwatch_analysis::{month_windows, CostAnalyzer};
use costwatch_common::types::{CreateTeamRequest, NotificationConfig, ServiceBreakdown, Team};
use costwatch_metrics::{CostSnapshot, CostSource, MetricsError, MetricsSource};
use costwatch_notify::Notifier;
use costwatch_server::app;
use costwatch_server::config::{AuthConfig, ServerConfig};
use costwatch_server::state::AppState;
use costwatch_storage::{CostRepository, LocalFileStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const API_KEY: &str = "test-api-key";

/// Per-account `(current, previous)` totals. Accounts mapped to `None`
/// simulate a broken metrics source.
pub struct ScriptedMetrics {
    costs: HashMap<String, Option<(f64, f64)>>,
    default: (f64, f64),
}

impl ScriptedMetrics {
    pub fn new() -> Self {
        Self {
            costs: HashMap::new(),
            default: (1000.0, 1000.0),
        }
    }

    pub fn with(mut self, account_id: &str, current: f64, previous: f64) -> Self {
        self.costs
            .insert(account_id.to_string(), Some((current, previous)));
        self
    }

    pub fn failing(mut self, account_id: &str) -> Self {
        self.costs.insert(account_id.to_string(), None);
        self
    }
}

#[async_trait]
impl MetricsSource for ScriptedMetrics {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(
        &self,
        account_id: &str,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> costwatch_metrics::Result<CostSnapshot> {
        let (current, previous) = match self.costs.get(account_id) {
            Some(Some(pair)) => *pair,
            Some(None) => {
                return Err(MetricsError::Unavailable(format!(
                    "scripted outage for {account_id}"
                )))
            }
            None => self.default,
        };
        let total = if start == month_windows(Utc::now()).current_start {
            current
        } else {
            previous
        };
        let mut breakdown = ServiceBreakdown::new();
        breakdown.insert("EC2".to_string(), total * 0.75);
        breakdown.insert("S3".to_string(), total * 0.25);
        Ok(CostSnapshot {
            total_cost: total,
            service_breakdown: breakdown,
            source: CostSource::Datadog,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> costwatch_notify::Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn build_test_context() -> Result<TestContext> {
    build_test_context_with(ScriptedMetrics::new(), Arc::new(NullGenerator)).await
}

pub async fn build_test_context_with(
    metrics: ScriptedMetrics,
    generator: Arc<dyn InsightGenerator>,
) -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let store = Arc::new(LocalFileStore::open(temp_dir.path()).await?);
    let repo = CostRepository::new(store, NotificationConfig::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let config = ServerConfig {
        auth: AuthConfig {
            api_key: API_KEY.to_string(),
            disable_auth: false,
        },
        ..ServerConfig::default()
    };

    let state = AppState::build(
        config,
        repo,
        Arc::new(CostAnalyzer::new(Arc::new(metrics))),
        generator,
        notifier.clone(),
    )
    .await?;
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
        notifier,
    })
}

pub fn team(name: &str, account_id: &str) -> Team {
    Team::from_request(CreateTeamRequest {
        team_name: name.to_string(),
        aws_account_id: account_id.to_string(),
        team_email: format!("{}@example.com", name.to_lowercase()),
        admin_emails: Vec::new(),
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.map(|b| b.to_string()).unwrap_or_default();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..40 {
        if check().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    false
}
