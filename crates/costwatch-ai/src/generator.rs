use crate::prompt;
use crate::providers::CompletionProvider;
use crate::rules;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use costwatch_common::types::{OrgSummary, TeamAnalysis};
use serde::Serialize;
use std::sync::Arc;

/// Next-month forecast for one team.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Prediction {
    pub prediction: String,
    /// Model name, or `basic-average` for the rule-based estimate.
    pub model: String,
    pub historical_months_analyzed: usize,
    pub generated_at: DateTime<Utc>,
}

/// Produces natural-language analysis from structured cost data.
///
/// Every method is infallible: implementations fall back to the
/// deterministic text in [`crate::rules`] when a model is unavailable.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    fn provider(&self) -> &str;

    fn model_name(&self) -> &str;

    /// `true` when backed by a completion API.
    fn is_live(&self) -> bool;

    /// Root-cause explanation of one team's month-over-month change.
    async fn explain_cost_change(&self, analysis: &TeamAnalysis) -> String;

    /// `history` is `(YYYY-MM, total)` pairs in any order.
    async fn predict_next_month(&self, history: &[(String, f64)], team_name: &str) -> Prediction;

    async fn executive_summary(&self, org: &OrgSummary) -> String;

    async fn recommendations(&self, org: &OrgSummary) -> String;
}

/// Rule-based generator used when no completion API is configured or AI is
/// switched off in the notification config.
#[derive(Debug, Default, Clone)]
pub struct NullGenerator;

#[async_trait]
impl InsightGenerator for NullGenerator {
    fn provider(&self) -> &str {
        "rules"
    }

    fn model_name(&self) -> &str {
        "basic"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn explain_cost_change(&self, analysis: &TeamAnalysis) -> String {
        rules::basic_analysis(analysis)
    }

    async fn predict_next_month(&self, history: &[(String, f64)], _team_name: &str) -> Prediction {
        basic_prediction(history)
    }

    async fn executive_summary(&self, org: &OrgSummary) -> String {
        rules::basic_executive_summary(org)
    }

    async fn recommendations(&self, org: &OrgSummary) -> String {
        rules::basic_recommendations(org)
    }
}

fn basic_prediction(history: &[(String, f64)]) -> Prediction {
    Prediction {
        prediction: rules::basic_prediction(history),
        model: "basic-average".to_string(),
        historical_months_analyzed: history.len(),
        generated_at: Utc::now(),
    }
}

/// Generator backed by a [`CompletionProvider`].
#[derive(Clone)]
pub struct LiveGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl LiveGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Runs a completion; an empty string means the model was unavailable.
    pub async fn complete(&self, prompt: &str, system: &str) -> String {
        match self.provider.complete(prompt, system).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(
                    provider = %self.provider.provider(),
                    error = %e,
                    "Completion failed, using rule-based text"
                );
                String::new()
            }
        }
    }
}

#[async_trait]
impl InsightGenerator for LiveGenerator {
    fn provider(&self) -> &str {
        self.provider.provider()
    }

    fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn explain_cost_change(&self, analysis: &TeamAnalysis) -> String {
        let text = self
            .complete(&prompt::build_analysis_prompt(analysis), prompt::ANALYSIS_SYSTEM)
            .await;
        if text.is_empty() {
            rules::basic_analysis(analysis)
        } else {
            text
        }
    }

    async fn predict_next_month(&self, history: &[(String, f64)], team_name: &str) -> Prediction {
        if history.len() < 2 {
            return basic_prediction(history);
        }
        let mut sorted = history.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let text = self
            .complete(
                &prompt::build_forecast_prompt(&sorted, team_name),
                prompt::FORECAST_SYSTEM,
            )
            .await;
        if text.is_empty() {
            return basic_prediction(history);
        }
        Prediction {
            prediction: text,
            model: self.model_name().to_string(),
            historical_months_analyzed: history.len(),
            generated_at: Utc::now(),
        }
    }

    async fn executive_summary(&self, org: &OrgSummary) -> String {
        let text = self
            .complete(&prompt::build_summary_prompt(org), prompt::SUMMARY_SYSTEM)
            .await;
        if text.is_empty() {
            rules::basic_executive_summary(org)
        } else {
            text
        }
    }

    async fn recommendations(&self, org: &OrgSummary) -> String {
        let text = self
            .complete(
                &prompt::build_recommendations_prompt(org),
                prompt::RECOMMENDATIONS_SYSTEM,
            )
            .await;
        if text.is_empty() {
            rules::basic_recommendations(org)
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn provider(&self) -> &str {
            "scripted"
        }

        fn model_name(&self) -> &str {
            "scripted-1"
        }

        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => anyhow::bail!("provider down"),
            }
        }
    }

    fn analysis() -> TeamAnalysis {
        TeamAnalysis {
            team_name: "Payments".to_string(),
            aws_account_id: "111".to_string(),
            team_email: "p@example.com".to_string(),
            current_month: "2024-03".to_string(),
            current_month_cost: 13000.0,
            previous_month: "2024-02".to_string(),
            previous_month_cost: 10000.0,
            percentage_change: 30.0,
            is_anomaly: true,
            service_breakdown: [("EC2".to_string(), 13000.0)].into_iter().collect(),
            previous_service_breakdown: [("EC2".to_string(), 10000.0)].into_iter().collect(),
            synthetic: false,
        }
    }

    #[tokio::test]
    async fn live_generator_returns_model_text() {
        let provider = ScriptedProvider::new(Some("  EC2 autoscaling doubled.  "));
        let generator = LiveGenerator::new(provider.clone());
        assert_eq!(
            generator.explain_cost_change(&analysis()).await,
            "EC2 autoscaling doubled."
        );
        assert!(generator.is_live());
        assert_eq!(generator.model_name(), "scripted-1");
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_rules() {
        let generator = LiveGenerator::new(ScriptedProvider::new(None));
        let text = generator.explain_cost_change(&analysis()).await;
        assert_eq!(text, rules::basic_analysis(&analysis()));
    }

    #[tokio::test]
    async fn slow_completion_endpoint_falls_back_to_rules() {
        use crate::providers::openai::{AiSettings, OpenAiCompatProvider};
        use std::time::Duration;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": "too late"}}]
                    }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new(AiSettings {
            api_key: "sk-test".to_string(),
            base_url: server.uri(),
            model: "gpt-test".to_string(),
            timeout: Duration::from_millis(100),
            temperature: 0.7,
            max_tokens: 256,
        })
        .unwrap();
        let generator = LiveGenerator::new(Arc::new(provider));

        let started = std::time::Instant::now();
        let text = generator.explain_cost_change(&analysis()).await;
        assert_eq!(text, rules::basic_analysis(&analysis()));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn empty_reply_counts_as_unavailable() {
        let generator = LiveGenerator::new(ScriptedProvider::new(Some("   ")));
        assert_eq!(generator.complete("p", "s").await, "");
        assert!(generator
            .explain_cost_change(&analysis())
            .await
            .starts_with("Cost increased by 30.0%"));
    }

    #[tokio::test]
    async fn prediction_needs_two_months_before_calling_model() {
        let provider = ScriptedProvider::new(Some("About $12,000"));
        let generator = LiveGenerator::new(provider.clone());

        let one = vec![("2024-01".to_string(), 900.0)];
        let p = generator.predict_next_month(&one, "Payments").await;
        assert_eq!(p.model, "basic-average");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let two = vec![
            ("2024-02".to_string(), 1100.0),
            ("2024-01".to_string(), 900.0),
        ];
        let p = generator.predict_next_month(&two, "Payments").await;
        assert_eq!(p.prediction, "About $12,000");
        assert_eq!(p.model, "scripted-1");
        assert_eq!(p.historical_months_analyzed, 2);
    }

    #[tokio::test]
    async fn null_generator_is_rule_based() {
        let generator = NullGenerator;
        assert!(!generator.is_live());
        let p = generator.predict_next_month(&[], "Payments").await;
        assert_eq!(p.prediction, "Insufficient data");
    }
}
