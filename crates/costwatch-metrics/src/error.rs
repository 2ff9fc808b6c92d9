/// Errors raised while talking to a cost metrics source.
///
/// The Datadog adapter catches these internally and substitutes synthetic
/// data; they surface to callers only from sources without a fallback.
///
/// # Examples
///
/// ```rust
/// use costwatch_metrics::error::MetricsError;
///
/// let err = MetricsError::Http { status: 403, body: "Forbidden".to_string() };
/// assert!(err.to_string().contains("403"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Non-2xx status from the metrics API.
    #[error("Metrics: HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    /// Transport failure or timeout from `reqwest`.
    #[error("Metrics: network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("Metrics: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source is reachable but reported nothing usable for the account.
    #[error("Metrics: no cost data for account '{0}'")]
    NoData(String),

    /// The source could not be contacted at all.
    #[error("Metrics: source unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, MetricsError>;
