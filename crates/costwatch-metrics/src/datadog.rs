use crate::error::{MetricsError, Result};
use crate::synthetic::synthetic_snapshot;
use crate::{CostSnapshot, CostSource, MetricsSource};
use chrono::NaiveDate;
use costwatch_common::types::{round2, ServiceBreakdown};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DatadogSettings {
    pub api_key: String,
    pub app_key: String,
    /// e.g. `datadoghq.com`, `datadoghq.eu`
    pub site: String,
    pub timeout: Duration,
}

/// Datadog Cloud Cost Management adapter.
///
/// Every failure (missing keys, non-200, transport error, empty result)
/// degrades to [`synthetic_snapshot`], so `fetch` never returns `Err`.
pub struct DatadogSource {
    settings: DatadogSettings,
    base_url: String,
    client: Client,
}

#[derive(Debug, Default, Deserialize)]
struct CostByOrgResponse {
    #[serde(default)]
    data: Vec<OrgCost>,
}

#[derive(Debug, Default, Deserialize)]
struct OrgCost {
    #[serde(default)]
    attributes: OrgAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct OrgAttributes {
    #[serde(default)]
    org_name: String,
    #[serde(default)]
    charges: Vec<Charge>,
}

#[derive(Debug, Deserialize)]
struct Charge {
    #[serde(default)]
    charge_type: Option<String>,
    #[serde(default)]
    cost: Option<f64>,
}

impl DatadogSource {
    pub fn new(settings: DatadogSettings) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(settings.timeout)
            .build()?;
        let base_url = format!("https://api.{}", settings.site);
        Ok(Self {
            settings,
            base_url,
            client,
        })
    }

    /// Points the adapter at another host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_cloud_cost(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CostSnapshot> {
        let url = format!("{}/api/v2/cost_by_org", self.base_url);
        let start_month = start.format("%Y-%m").to_string();
        let end_month = end.format("%Y-%m").to_string();

        let response = self
            .client
            .get(&url)
            .header("DD-API-KEY", &self.settings.api_key)
            .header("DD-APPLICATION-KEY", &self.settings.app_key)
            .header("Content-Type", "application/json")
            .query(&[
                ("start_month", start_month.as_str()),
                ("end_month", end_month.as_str()),
                ("view", "sub_org"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetricsError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: CostByOrgResponse = serde_json::from_slice(&bytes)?;
        summarize_charges(&parsed, account_id)
            .ok_or_else(|| MetricsError::NoData(account_id.to_string()))
    }
}

/// Sums charges across every sub-org whose name mentions `account_id`.
///
/// Returns `None` when the total is not positive.
fn summarize_charges(resp: &CostByOrgResponse, account_id: &str) -> Option<CostSnapshot> {
    let mut total = 0.0;
    let mut breakdown = ServiceBreakdown::new();
    for org in &resp.data {
        let attrs = &org.attributes;
        if !account_id.is_empty() && !attrs.org_name.contains(account_id) {
            continue;
        }
        for charge in &attrs.charges {
            let cost = charge.cost.unwrap_or(0.0);
            let kind = charge.charge_type.as_deref().unwrap_or("Other");
            total += cost;
            *breakdown.entry(kind.to_string()).or_insert(0.0) += cost;
        }
    }
    if total <= 0.0 {
        return None;
    }
    Some(CostSnapshot {
        total_cost: round2(total),
        service_breakdown: breakdown.into_iter().map(|(k, v)| (k, round2(v))).collect(),
        source: CostSource::Datadog,
    })
}

#[async_trait::async_trait]
impl MetricsSource for DatadogSource {
    fn name(&self) -> &str {
        "datadog"
    }

    fn is_configured(&self) -> bool {
        !self.settings.api_key.is_empty() && !self.settings.app_key.is_empty()
    }

    async fn fetch(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CostSnapshot> {
        if !self.is_configured() {
            tracing::warn!(account_id = %account_id, "Datadog credentials not configured, using synthetic data");
            return Ok(synthetic_snapshot());
        }

        match self.fetch_cloud_cost(account_id, start, end).await {
            Ok(snapshot) => {
                tracing::debug!(
                    account_id = %account_id,
                    total_cost = snapshot.total_cost,
                    "Fetched cost from Datadog"
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(
                    account_id = %account_id,
                    error = %e,
                    "Datadog cost fetch failed, using synthetic data"
                );
                Ok(synthetic_snapshot())
            }
        }
    }
}
