use crate::{CostSnapshot, CostSource, MetricsSource, Result};
use chrono::NaiveDate;
use costwatch_common::types::{round2, ServiceBreakdown};
use rand::Rng;

/// Category split applied to the random base amount.
const SHARES: [(&str, f64); 6] = [
    ("EC2", 0.40),
    ("RDS", 0.25),
    ("S3", 0.15),
    ("Lambda", 0.10),
    ("CloudWatch", 0.05),
    ("Other", 0.05),
];

/// Random but plausibly shaped spend between $1,000 and $50,000.
pub fn synthetic_snapshot() -> CostSnapshot {
    let base: f64 = rand::thread_rng().gen_range(1000.0..50000.0);
    let parts: Vec<(&str, f64)> = SHARES
        .iter()
        .map(|(name, share)| (*name, base * share))
        .collect();
    let total: f64 = parts.iter().map(|(_, v)| v).sum();
    let service_breakdown: ServiceBreakdown = parts
        .into_iter()
        .map(|(name, v)| (name.to_string(), round2(v)))
        .collect();
    CostSnapshot {
        total_cost: round2(total),
        service_breakdown,
        source: CostSource::Synthetic,
    }
}

/// Source that only ever returns synthetic data. Used in demo mode.
#[derive(Debug, Default, Clone)]
pub struct SyntheticSource;

#[async_trait::async_trait]
impl MetricsSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn fetch(
        &self,
        account_id: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<CostSnapshot> {
        tracing::debug!(account_id = %account_id, "Generating synthetic cost data");
        Ok(synthetic_snapshot())
    }
}
