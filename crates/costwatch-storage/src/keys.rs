//! Key namespace shared with anything else that reads the bucket.
//!
//! ```text
//! config/notification_config.json
//! teams/teams.json
//! costs/{YYYY}/{MM}/{account_id}.json
//! anomalies/{YYYY}/{MM}/anomalies.json
//! ai_insights/{YYYY}/{MM}/insights.json
//! ```

use crate::error::{Result, StorageError};

pub const CONFIG_KEY: &str = "config/notification_config.json";
pub const TEAMS_KEY: &str = "teams/teams.json";
pub const COSTS_PREFIX: &str = "costs/";
pub const ANOMALIES_PREFIX: &str = "anomalies/";
pub const INSIGHTS_PREFIX: &str = "ai_insights/";

/// Splits `YYYY-MM` into its year and month components.
pub fn month_parts(month: &str) -> Result<(&str, &str)> {
    let (year, mon) = month
        .split_once('-')
        .ok_or_else(|| StorageError::InvalidMonth(month.to_string()))?;
    let valid_year = year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit());
    let valid_month = mon.len() == 2
        && mon.bytes().all(|b| b.is_ascii_digit())
        && matches!(mon.parse::<u8>(), Ok(1..=12));
    if !valid_year || !valid_month {
        return Err(StorageError::InvalidMonth(month.to_string()));
    }
    Ok((year, mon))
}

/// Rejects keys that are empty, absolute, or try to leave the namespace.
pub fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg == ".." || seg == ".");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn segment(value: &str) -> Result<&str> {
    if value.is_empty() || value.contains('/') || value == ".." || value == "." {
        return Err(StorageError::InvalidKey(value.to_string()));
    }
    Ok(value)
}

pub fn costs_key(month: &str, account_id: &str) -> Result<String> {
    let (year, mon) = month_parts(month)?;
    Ok(format!("costs/{year}/{mon}/{}.json", segment(account_id)?))
}

pub fn costs_month_prefix(month: &str) -> Result<String> {
    let (year, mon) = month_parts(month)?;
    Ok(format!("costs/{year}/{mon}/"))
}

pub fn anomalies_key(month: &str) -> Result<String> {
    let (year, mon) = month_parts(month)?;
    Ok(format!("anomalies/{year}/{mon}/anomalies.json"))
}

pub fn insights_key(month: &str) -> Result<String> {
    let (year, mon) = month_parts(month)?;
    Ok(format!("ai_insights/{year}/{mon}/insights.json"))
}
