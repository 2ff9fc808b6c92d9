use crate::error::{Result, StorageError};
use crate::keys;
use crate::{DocumentStore, StorageInfo};
use chrono::{DateTime, Utc};
use costwatch_common::types::{
    AIInsight, CostAnomaly, CostRecord, NotificationConfig, Team, UpdateConfigRequest,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct TeamsDocument {
    #[serde(default)]
    teams: Vec<Team>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CostBucket {
    aws_account_id: String,
    month: String,
    #[serde(default)]
    records: Vec<CostRecord>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnomalyBucket {
    month: String,
    #[serde(default)]
    anomalies: Vec<CostAnomaly>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InsightBucket {
    month: String,
    #[serde(default)]
    insights: Vec<AIInsight>,
    last_updated: DateTime<Utc>,
}

/// Result of a bulk team registration.
#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct BulkOutcome {
    pub created: Vec<Team>,
    /// Account ids that were already registered or repeated in the batch.
    pub skipped: Vec<String>,
}

/// Domain-level access to the document store.
///
/// Bucket appends are read-modify-write of the whole document with no
/// version check. Two writers appending to the same bucket at once can
/// lose one update; the same holds for the team list.
#[derive(Clone)]
pub struct CostRepository {
    store: Arc<dyn DocumentStore>,
    defaults: NotificationConfig,
}

impl CostRepository {
    /// `defaults` seeds the notification config the first time it is read.
    pub fn new(store: Arc<dyn DocumentStore>, defaults: NotificationConfig) -> Self {
        Self { store, defaults }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn storage_info(&self) -> StorageInfo {
        let mut info = self.store.info();
        info.healthy = info.healthy && self.store.health_check().await;
        info
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.store.get(key).await?;
        match serde_json::from_value(value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Stored document has unexpected shape");
                None
            }
        }
    }

    async fn save<T: Serialize>(&self, key: &str, doc: &T) -> Result<()> {
        let value = serde_json::to_value(doc)?;
        self.store.write(key, &value).await
    }

    // ---- config ----

    /// Returns the notification config, persisting the defaults on first use.
    pub async fn get_config(&self) -> NotificationConfig {
        match self.store.get(keys::CONFIG_KEY).await {
            Some(value) => match serde_json::from_value(value) {
                Ok(config) => config,
                Err(e) => {
                    // Leave the unreadable document in place for an operator to inspect.
                    tracing::error!(error = %e, "Stored notification config is invalid, using defaults");
                    self.defaults.clone()
                }
            },
            None => {
                let config = NotificationConfig {
                    updated_at: Utc::now(),
                    ..self.defaults.clone()
                };
                if let Err(e) = self.save(keys::CONFIG_KEY, &config).await {
                    tracing::error!(error = %e, "Failed to persist default notification config");
                }
                config
            }
        }
    }

    pub async fn save_config(&self, config: &NotificationConfig) -> Result<()> {
        self.save(keys::CONFIG_KEY, config).await
    }

    /// Applies a partial update and persists it.
    ///
    /// Returns the stored config and whether the schedule day or hour changed.
    pub async fn update_config(
        &self,
        update: &UpdateConfigRequest,
    ) -> Result<(NotificationConfig, bool)> {
        let mut config = self.get_config().await;
        let schedule_changed = update
            .apply_to(&mut config)
            .map_err(StorageError::InvalidConfig)?;
        self.save_config(&config).await?;
        Ok((config, schedule_changed))
    }

    // ---- teams ----

    pub async fn list_teams(&self) -> Vec<Team> {
        self.load::<TeamsDocument>(keys::TEAMS_KEY)
            .await
            .map(|doc| doc.teams)
            .unwrap_or_default()
    }

    async fn save_teams(&self, teams: Vec<Team>) -> Result<()> {
        let doc = TeamsDocument {
            teams,
            updated_at: Utc::now(),
        };
        self.save(keys::TEAMS_KEY, &doc).await
    }

    pub async fn get_team(&self, id: &str) -> Option<Team> {
        self.list_teams().await.into_iter().find(|t| t.id == id)
    }

    /// Registers a team. Rejects an `aws_account_id` that is already in use
    /// without touching the stored list.
    pub async fn add_team(&self, team: Team) -> Result<Team> {
        let mut teams = self.list_teams().await;
        if teams.iter().any(|t| t.aws_account_id == team.aws_account_id) {
            return Err(StorageError::DuplicateAccount(team.aws_account_id));
        }
        teams.push(team.clone());
        self.save_teams(teams).await?;
        Ok(team)
    }

    /// Registers several teams in one write, skipping duplicate accounts.
    pub async fn add_teams_bulk(&self, new_teams: Vec<Team>) -> Result<BulkOutcome> {
        let mut teams = self.list_teams().await;
        let mut outcome = BulkOutcome::default();
        for team in new_teams {
            if teams.iter().any(|t| t.aws_account_id == team.aws_account_id) {
                outcome.skipped.push(team.aws_account_id);
                continue;
            }
            teams.push(team.clone());
            outcome.created.push(team);
        }
        if !outcome.created.is_empty() {
            self.save_teams(teams).await?;
        }
        Ok(outcome)
    }

    /// Returns `Ok(false)` when no team has this id.
    pub async fn delete_team(&self, id: &str) -> Result<bool> {
        let teams = self.list_teams().await;
        let before = teams.len();
        let remaining: Vec<Team> = teams.into_iter().filter(|t| t.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.save_teams(remaining).await?;
        Ok(true)
    }

    // ---- cost records ----

    pub async fn save_cost_record(&self, record: &CostRecord) -> Result<()> {
        let key = keys::costs_key(&record.month, &record.aws_account_id)?;
        let mut records = self
            .load::<CostBucket>(&key)
            .await
            .map(|b| b.records)
            .unwrap_or_default();
        records.push(record.clone());
        let bucket = CostBucket {
            aws_account_id: record.aws_account_id.clone(),
            month: record.month.clone(),
            records,
            last_updated: Utc::now(),
        };
        self.save(&key, &bucket).await
    }

    /// Cost records, most recently fetched first, capped at `limit`.
    pub async fn cost_history(
        &self,
        team_name: Option<&str>,
        month: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CostRecord>> {
        let prefix = match month {
            Some(m) => keys::costs_month_prefix(m)?,
            None => keys::COSTS_PREFIX.to_string(),
        };
        let mut records = Vec::new();
        for key in self.store.list(&prefix).await {
            if let Some(bucket) = self.load::<CostBucket>(&key).await {
                records.extend(
                    bucket
                        .records
                        .into_iter()
                        .filter(|r| team_name.map_or(true, |name| r.team_name == name)),
                );
            }
        }
        records.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        records.truncate(limit);
        Ok(records)
    }

    /// Latest total per month for one account, oldest month first.
    pub async fn team_cost_history(&self, aws_account_id: &str) -> Vec<(String, f64)> {
        let suffix = format!("/{aws_account_id}.json");
        let mut latest: BTreeMap<String, CostRecord> = BTreeMap::new();
        for key in self.store.list(keys::COSTS_PREFIX).await {
            if !key.ends_with(&suffix) {
                continue;
            }
            let Some(bucket) = self.load::<CostBucket>(&key).await else {
                continue;
            };
            for record in bucket.records {
                let newer = latest
                    .get(&record.month)
                    .map_or(true, |seen| record.fetched_at > seen.fetched_at);
                if newer {
                    latest.insert(record.month.clone(), record);
                }
            }
        }
        latest
            .into_iter()
            .map(|(month, r)| (month, r.total_cost))
            .collect()
    }

    // ---- anomalies ----

    pub async fn save_anomaly(&self, anomaly: &CostAnomaly) -> Result<()> {
        let key = keys::anomalies_key(&anomaly.current_month)?;
        let mut anomalies = self
            .load::<AnomalyBucket>(&key)
            .await
            .map(|b| b.anomalies)
            .unwrap_or_default();
        anomalies.push(anomaly.clone());
        let bucket = AnomalyBucket {
            month: anomaly.current_month.clone(),
            anomalies,
            last_updated: Utc::now(),
        };
        self.save(&key, &bucket).await
    }

    /// Anomalies, most recently detected first, capped at `limit`.
    pub async fn anomalies(&self, team_name: Option<&str>, limit: usize) -> Vec<CostAnomaly> {
        let mut out = Vec::new();
        for key in self.store.list(keys::ANOMALIES_PREFIX).await {
            if !key.ends_with("/anomalies.json") {
                continue;
            }
            if let Some(bucket) = self.load::<AnomalyBucket>(&key).await {
                out.extend(
                    bucket
                        .anomalies
                        .into_iter()
                        .filter(|a| team_name.map_or(true, |name| a.team_name == name)),
                );
            }
        }
        out.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        out.truncate(limit);
        out
    }

    // ---- insights ----

    pub async fn save_insight(&self, insight: &AIInsight) -> Result<()> {
        let month = insight.generated_at.format("%Y-%m").to_string();
        let key = keys::insights_key(&month)?;
        let mut insights = self
            .load::<InsightBucket>(&key)
            .await
            .map(|b| b.insights)
            .unwrap_or_default();
        insights.push(insight.clone());
        let bucket = InsightBucket {
            month,
            insights,
            last_updated: Utc::now(),
        };
        self.save(&key, &bucket).await
    }

    pub async fn insights(&self, limit: usize) -> Vec<AIInsight> {
        let mut out = Vec::new();
        for key in self.store.list(keys::INSIGHTS_PREFIX).await {
            if let Some(bucket) = self.load::<InsightBucket>(&key).await {
                out.extend(bucket.insights);
            }
        }
        out.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        out.truncate(limit);
        out
    }
}
