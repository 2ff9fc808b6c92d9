use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};

/// A `limit` query cap: default when absent, clamped to `1..=max`.
#[derive(Debug, Clone, Copy)]
pub struct LimitRule {
    pub default: u64,
    pub max: u64,
}

pub const COST_HISTORY: LimitRule = LimitRule {
    default: 100,
    max: 1000,
};

pub const ANOMALIES: LimitRule = LimitRule {
    default: 50,
    max: 500,
};

pub const INSIGHTS: LimitRule = LimitRule {
    default: 20,
    max: 100,
};

impl LimitRule {
    pub fn apply(&self, requested: Option<u64>) -> usize {
        requested.unwrap_or(self.default).clamp(1, self.max) as usize
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum U64Input {
    Number(u64),
    Text(String),
}

/// Accepts a number or a numeric string; an empty string counts as absent.
pub fn deserialize_optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<U64Input>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(U64Input::Number(number)) => Ok(Some(number)),
        Some(U64Input::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(U64Input::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(DeError::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_default_and_clamp() {
        assert_eq!(COST_HISTORY.apply(None), 100);
        assert_eq!(COST_HISTORY.apply(Some(5000)), 1000);
        assert_eq!(ANOMALIES.apply(Some(0)), 1);
        assert_eq!(ANOMALIES.apply(Some(10)), 10);
        assert_eq!(INSIGHTS.apply(Some(101)), 100);
    }

    #[derive(Deserialize)]
    struct Q {
        #[serde(default, deserialize_with = "deserialize_optional_u64")]
        limit: Option<u64>,
    }

    #[test]
    fn limit_accepts_strings_and_numbers() {
        let q: Q = serde_json::from_str(r#"{"limit":"25"}"#).unwrap();
        assert_eq!(q.limit, Some(25));
        let q: Q = serde_json::from_str(r#"{"limit":7}"#).unwrap();
        assert_eq!(q.limit, Some(7));
        let q: Q = serde_json::from_str(r#"{"limit":""}"#).unwrap();
        assert_eq!(q.limit, None);
        let q: Q = serde_json::from_str("{}").unwrap();
        assert_eq!(q.limit, None);
        assert!(serde_json::from_str::<Q>(r#"{"limit":"abc"}"#).is_err());
    }
}
