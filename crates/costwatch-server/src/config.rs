use costwatch_ai::AiSettings;
use costwatch_common::types::{NotificationConfig, ScheduleDay};
use costwatch_metrics::DatadogSettings;
use costwatch_notify::SmtpSettings;
use costwatch_storage::StorageSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS origins; empty allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub datadog: DatadogConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_local_dir")]
    pub local_dir: String,
    /// Try S3 before the local directory.
    #[serde(default = "default_true")]
    pub prefer_remote: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            local_dir: default_local_dir(),
            prefer_remote: true,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatadogConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub app_key: String,
    #[serde(default = "default_datadog_site")]
    pub site: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DatadogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_key: String::new(),
            site: default_datadog_site(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Empty selects the rule-based generator.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Empty disables delivery; reports are only logged.
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_sender")]
    pub sender: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            sender: default_sender(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub disable_auth: bool,
}

/// Seed values for the notification config document when none is stored yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_threshold")]
    pub anomaly_threshold: f64,
    #[serde(default = "default_schedule_day")]
    pub schedule_day: String,
    #[serde(default = "default_schedule_hour")]
    pub schedule_hour: u8,
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: default_threshold(),
            schedule_day: default_schedule_day(),
            schedule_hour: default_schedule_hour(),
            admin_emails: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How long shutdown waits for in-flight report runs.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_bucket() -> String {
    "aws-cost-agent-data".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_local_dir() -> String {
    "data".to_string()
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_datadog_site() -> String {
    "datadoghq.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    2048
}

fn default_smtp_port() -> u16 {
    587
}

fn default_sender() -> String {
    "costwatch@localhost".to_string()
}

fn default_threshold() -> f64 {
    20.0
}

fn default_schedule_day() -> String {
    "monday".to_string()
}

fn default_schedule_hour() -> u8 {
    9
}

fn default_shutdown_grace_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            storage: StorageConfig::default(),
            datadog: DatadogConfig::default(),
            ai: AiConfig::default(),
            smtp: SmtpConfig::default(),
            auth: AuthConfig::default(),
            defaults: DefaultsConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the TOML file and applies secret overrides from the environment.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Overrides secrets with non-empty values returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("COSTWATCH_API_KEY") {
            self.auth.api_key = v;
        }
        if let Some(v) = get("DATADOG_API_KEY") {
            self.datadog.api_key = v;
        }
        if let Some(v) = get("DATADOG_APP_KEY") {
            self.datadog.app_key = v;
        }
        if let Some(v) = get("SMTP_PASSWORD") {
            self.smtp.password = v;
        }
        if let Some(v) = get("AI_API_KEY") {
            self.ai.api_key = v;
        }
    }

    pub fn storage_settings(&self) -> StorageSettings {
        StorageSettings {
            bucket: self.storage.bucket.clone(),
            region: self.storage.region.clone(),
            local_dir: PathBuf::from(&self.storage.local_dir),
            prefer_remote: self.storage.prefer_remote,
            connect_timeout: Duration::from_secs(self.storage.connect_timeout_secs),
        }
    }

    pub fn datadog_settings(&self) -> DatadogSettings {
        DatadogSettings {
            api_key: self.datadog.api_key.clone(),
            app_key: self.datadog.app_key.clone(),
            site: self.datadog.site.clone(),
            timeout: Duration::from_secs(self.datadog.timeout_secs),
        }
    }

    pub fn ai_settings(&self) -> AiSettings {
        AiSettings {
            api_key: self.ai.api_key.clone(),
            base_url: self.ai.base_url.clone(),
            model: self.ai.model.clone(),
            timeout: Duration::from_secs(self.ai.timeout_secs),
            temperature: self.ai.temperature,
            max_tokens: self.ai.max_tokens,
        }
    }

    /// `None` when no SMTP host is configured.
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        if self.smtp.host.trim().is_empty() {
            return None;
        }
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Some(SmtpSettings {
            host: self.smtp.host.clone(),
            port: self.smtp.port,
            username: non_empty(&self.smtp.username),
            password: non_empty(&self.smtp.password),
            sender: self.smtp.sender.clone(),
        })
    }

    pub fn default_notification_config(&self) -> NotificationConfig {
        let day = self
            .defaults
            .schedule_day
            .parse::<ScheduleDay>()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid defaults.schedule_day, using monday");
                ScheduleDay::Monday
            });
        NotificationConfig::new(
            self.defaults.anomaly_threshold,
            day,
            self.defaults.schedule_hour,
            self.defaults.admin_emails.clone(),
        )
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.scheduler.shutdown_grace_secs)
    }
}
