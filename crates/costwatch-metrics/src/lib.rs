pub mod datadog;
pub mod error;
pub mod synthetic;

use chrono::NaiveDate;
use costwatch_common::types::ServiceBreakdown;
use serde::{Deserialize, Serialize};

pub use datadog::{DatadogSettings, DatadogSource};
pub use error::{MetricsError, Result};
pub use synthetic::{synthetic_snapshot, SyntheticSource};

/// Where a [`CostSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostSource {
    Datadog,
    Synthetic,
}

/// Total spend for one account over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub total_cost: f64,
    pub service_breakdown: ServiceBreakdown,
    pub source: CostSource,
}

impl CostSnapshot {
    /// Demo data generated because the real source was unavailable.
    pub fn is_synthetic(&self) -> bool {
        self.source == CostSource::Synthetic
    }
}

/// Source of per-account cost figures.
///
/// Production adapters degrade to synthetic data instead of failing, so an
/// `Err` here means the source itself is broken (e.g. a test double that
/// simulates an outage) and the caller should skip the account.
#[async_trait::async_trait]
pub trait MetricsSource: Send + Sync {
    /// Source name for logs and health output (e.g. "datadog").
    fn name(&self) -> &str;

    /// `false` when credentials are missing and every fetch is synthetic.
    fn is_configured(&self) -> bool;

    /// Cost for `account_id` between `start` and `end`, both inclusive, UTC.
    async fn fetch(&self, account_id: &str, start: NaiveDate, end: NaiveDate)
        -> Result<CostSnapshot>;
}
