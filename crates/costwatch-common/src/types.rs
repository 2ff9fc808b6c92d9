use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Cost per service category (e.g. `"EC2" -> 1234.56`).
pub type ServiceBreakdown = BTreeMap<String, f64>;

/// Rounds a dollar amount or percentage to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Formats an amount with thousands separators and 2 decimals, e.g. `12,345.60`.
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// A team and the AWS account it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Team {
    pub id: String,
    pub team_name: String,
    pub aws_account_id: String,
    pub team_email: String,
    #[serde(default)]
    pub admin_emails: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn from_request(req: CreateTeamRequest) -> Self {
        Self {
            id: crate::id::next_id(),
            team_name: req.team_name.trim().to_string(),
            aws_account_id: req.aws_account_id.trim().to_string(),
            team_email: req.team_email.trim().to_string(),
            admin_emails: req
                .admin_emails
                .into_iter()
                .map(|e| e.trim().to_string())
                .collect(),
            created_at: Utc::now(),
        }
    }

    /// Team mailbox followed by the team's admins, without duplicates.
    pub fn recipients(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(1 + self.admin_emails.len());
        for email in std::iter::once(&self.team_email).chain(self.admin_emails.iter()) {
            if !email.is_empty() && !out.iter().any(|e| e.eq_ignore_ascii_case(email)) {
                out.push(email.clone());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateTeamRequest {
    pub team_name: String,
    pub aws_account_id: String,
    pub team_email: String,
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl CreateTeamRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.team_name.trim().is_empty() {
            return Err("team_name must not be empty".to_string());
        }
        if self.aws_account_id.trim().is_empty() {
            return Err("aws_account_id must not be empty".to_string());
        }
        if !looks_like_email(&self.team_email) {
            return Err(format!("invalid team_email '{}'", self.team_email));
        }
        if let Some(bad) = self.admin_emails.iter().find(|e| !looks_like_email(e)) {
            return Err(format!("invalid admin email '{bad}'"));
        }
        Ok(())
    }
}

pub fn looks_like_email(s: &str) -> bool {
    let s = s.trim();
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Day of week the weekly report fires on.
///
/// # Examples
///
/// ```
/// use costwatch_common::types::ScheduleDay;
///
/// let day: ScheduleDay = "Friday".parse().unwrap();
/// assert_eq!(day, ScheduleDay::Friday);
/// assert_eq!(day.to_string(), "friday");
/// assert!("funday".parse::<ScheduleDay>().is_err());
/// assert_eq!(ScheduleDay::lenient("funday"), ScheduleDay::Monday);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleDay {
    #[default]
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl ScheduleDay {
    pub const ALL: [ScheduleDay; 7] = [
        ScheduleDay::Monday,
        ScheduleDay::Tuesday,
        ScheduleDay::Wednesday,
        ScheduleDay::Thursday,
        ScheduleDay::Friday,
        ScheduleDay::Saturday,
        ScheduleDay::Sunday,
    ];

    /// Parses a day name, falling back to Monday for anything unrecognised.
    ///
    /// Used only for values already persisted by other tools; API writes go
    /// through the strict `FromStr` and are rejected instead.
    pub fn lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    /// Day-of-week token understood by cron expressions.
    pub fn cron_token(&self) -> &'static str {
        match self {
            Self::Monday => "Mon",
            Self::Tuesday => "Tue",
            Self::Wednesday => "Wed",
            Self::Thursday => "Thu",
            Self::Friday => "Fri",
            Self::Saturday => "Sat",
            Self::Sunday => "Sun",
        }
    }

    /// Zero-based index with Monday = 0.
    pub fn index(&self) -> u32 {
        self.weekday().num_days_from_monday()
    }

    pub fn weekday(&self) -> Weekday {
        match self {
            Self::Monday => Weekday::Mon,
            Self::Tuesday => Weekday::Tue,
            Self::Wednesday => Weekday::Wed,
            Self::Thursday => Weekday::Thu,
            Self::Friday => Weekday::Fri,
            Self::Saturday => Weekday::Sat,
            Self::Sunday => Weekday::Sun,
        }
    }
}

impl std::fmt::Display for ScheduleDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScheduleDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ScheduleDay::ALL
            .into_iter()
            .find(|d| d.as_str() == lower || d.as_str()[..3] == lower)
            .ok_or_else(|| {
                format!("unknown schedule_day '{s}', expected one of monday..sunday")
            })
    }
}

fn lenient_schedule_day<'de, D>(deserializer: D) -> Result<ScheduleDay, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(ScheduleDay::lenient(&raw))
}

fn lenient_schedule_hour<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, 23) as u8)
}

/// Singleton notification settings stored at `config/notification_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NotificationConfig {
    /// Percent increase above which a team is flagged.
    pub anomaly_threshold: f64,
    #[serde(deserialize_with = "lenient_schedule_day")]
    pub schedule_day: ScheduleDay,
    /// UTC hour, 0-23.
    #[serde(deserialize_with = "lenient_schedule_hour")]
    pub schedule_hour: u8,
    #[serde(default)]
    pub global_admin_emails: Vec<String>,
    #[serde(default = "default_ai_enabled")]
    pub ai_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

fn default_ai_enabled() -> bool {
    true
}

impl NotificationConfig {
    pub fn new(
        anomaly_threshold: f64,
        schedule_day: ScheduleDay,
        schedule_hour: u8,
        global_admin_emails: Vec<String>,
    ) -> Self {
        Self {
            anomaly_threshold,
            schedule_day,
            schedule_hour: schedule_hour.min(23),
            global_admin_emails,
            ai_enabled: true,
            updated_at: Utc::now(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self::new(20.0, ScheduleDay::Monday, 9, Vec::new())
    }
}

/// Partial update; only fields that are present are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateConfigRequest {
    pub anomaly_threshold: Option<f64>,
    pub schedule_day: Option<String>,
    pub schedule_hour: Option<i64>,
    pub global_admin_emails: Option<Vec<String>>,
    pub ai_enabled: Option<bool>,
}

/// Rejections raised while applying an [`UpdateConfigRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdateError {
    InvalidSchedule(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigUpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSchedule(msg) | Self::Invalid(msg) => f.write_str(msg),
        }
    }
}

impl UpdateConfigRequest {
    /// Validates every present field, then applies them to `config`.
    ///
    /// Returns `true` when the schedule day or hour changed. Nothing is
    /// applied if any field is invalid.
    pub fn apply_to(&self, config: &mut NotificationConfig) -> Result<bool, ConfigUpdateError> {
        let day = match &self.schedule_day {
            Some(raw) => Some(
                raw.parse::<ScheduleDay>()
                    .map_err(ConfigUpdateError::InvalidSchedule)?,
            ),
            None => None,
        };
        let hour = match self.schedule_hour {
            Some(h) if (0..=23).contains(&h) => Some(h as u8),
            Some(h) => {
                return Err(ConfigUpdateError::InvalidSchedule(format!(
                    "schedule_hour must be between 0 and 23, got {h}"
                )))
            }
            None => None,
        };
        if let Some(t) = self.anomaly_threshold {
            if !t.is_finite() || t < 0.0 {
                return Err(ConfigUpdateError::Invalid(format!(
                    "anomaly_threshold must be a non-negative number, got {t}"
                )));
            }
        }
        if let Some(bad) = self
            .global_admin_emails
            .iter()
            .flatten()
            .find(|e| !looks_like_email(e))
        {
            return Err(ConfigUpdateError::Invalid(format!(
                "invalid admin email '{bad}'"
            )));
        }

        let before = (config.schedule_day, config.schedule_hour);
        if let Some(t) = self.anomaly_threshold {
            config.anomaly_threshold = t;
        }
        if let Some(d) = day {
            config.schedule_day = d;
        }
        if let Some(h) = hour {
            config.schedule_hour = h;
        }
        if let Some(emails) = &self.global_admin_emails {
            config.global_admin_emails = emails.clone();
        }
        if let Some(enabled) = self.ai_enabled {
            config.ai_enabled = enabled;
        }
        config.updated_at = Utc::now();
        Ok(before != (config.schedule_day, config.schedule_hour))
    }
}

/// One cost snapshot for an account in a month. Appended, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CostRecord {
    pub id: String,
    pub aws_account_id: String,
    pub team_name: String,
    /// `YYYY-MM`
    pub month: String,
    pub total_cost: f64,
    #[serde(default)]
    pub service_breakdown: ServiceBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CostAnomaly {
    pub id: String,
    pub aws_account_id: String,
    pub team_name: String,
    pub current_month: String,
    pub current_cost: f64,
    pub previous_month: String,
    pub previous_cost: f64,
    /// Signed percent change, rounded to 2 decimals.
    pub percentage_change: f64,
    pub is_anomaly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_explanation: Option<String>,
    pub detected_at: DateTime<Utc>,
}

/// Org-wide narrative produced by a weekly run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AIInsight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: String,
    pub executive_summary: String,
    pub recommendations: String,
    pub teams_analyzed: usize,
    pub anomalies_detected: usize,
    pub generated_at: DateTime<Utc>,
}

/// Month-over-month comparison for one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TeamAnalysis {
    pub team_name: String,
    pub aws_account_id: String,
    pub team_email: String,
    /// `YYYY-MM`
    pub current_month: String,
    pub current_month_cost: f64,
    pub previous_month: String,
    pub previous_month_cost: f64,
    /// Signed, rounded to 2 decimals.
    pub percentage_change: f64,
    pub is_anomaly: bool,
    pub service_breakdown: ServiceBreakdown,
    pub previous_service_breakdown: ServiceBreakdown,
    /// At least one period came from synthetic data.
    #[serde(default)]
    pub synthetic: bool,
}

/// Org-wide roll-up of a set of [`TeamAnalysis`] results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OrgSummary {
    pub accounts: usize,
    pub total_current: f64,
    pub total_previous: f64,
    pub percentage_change: f64,
    pub anomalies_count: usize,
    /// Highest current spend first.
    pub top_spenders: Vec<TeamAnalysis>,
    /// Largest absolute change first, anomalies only.
    pub top_anomalies: Vec<TeamAnalysis>,
}
