use costwatch_metrics::MetricsError;

/// Errors from analyzing a single team.
///
/// A batch run catches these per team and moves on.
///
/// # Examples
///
/// ```rust
/// use costwatch_analysis::error::AnalysisError;
/// use costwatch_metrics::MetricsError;
///
/// let err = AnalysisError::Metrics {
///     account_id: "123".to_string(),
///     source: MetricsError::Unavailable("down".to_string()),
/// };
/// assert!(err.to_string().contains("123"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The metrics source failed for this account.
    #[error("Analysis: metrics fetch failed for account '{account_id}': {source}")]
    Metrics {
        account_id: String,
        #[source]
        source: MetricsError,
    },

    /// The team record cannot be analyzed (e.g. empty account id).
    #[error("Analysis: invalid team: {0}")]
    InvalidTeam(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
