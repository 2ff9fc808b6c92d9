use super::CompletionProvider;
use crate::models::{ChatMessage, ChatRequest, ChatResponse, Role};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub api_key: String,
    /// Base URL up to, not including, `/chat/completions`.
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Provider for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    max_tokens: usize,
    temperature: f32,
}

impl OpenAiCompatProvider {
    pub fn new(settings: AiSettings) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key: settings.api_key,
            model: settings.model,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    fn provider(&self) -> &str {
        "openai-compatible"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, system: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage::new(Role::System, system));
        }
        messages.push(ChatMessage::new(Role::User, prompt));

        let req = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Requesting completion");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("completion request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Completion endpoint returned an error");
            anyhow::bail!("completion endpoint answered {status}");
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .context("completion response was not valid JSON")?;
        if let Some(usage) = &parsed.usage {
            tracing::debug!(total_tokens = usage.total_tokens, "Completion received");
        }
        parsed
            .into_text()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("completion response had no content"))
    }
}
