use costwatch_common::types::ConfigUpdateError;

/// Errors that can occur within the storage layer.
///
/// Backends return these from the fallible `read`/`write`/`list_keys`/`remove`
/// methods. The soft-fail `get`/`put`/`list`/`delete` wrappers on
/// [`crate::DocumentStore`] log them and degrade to "no data".
///
/// # Examples
///
/// ```rust
/// use costwatch_storage::error::StorageError;
///
/// let err = StorageError::DuplicateAccount("123456789012".to_string());
/// assert!(err.to_string().contains("123456789012"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A team with the same AWS account id is already registered.
    #[error("Storage: aws_account_id '{0}' is already registered")]
    DuplicateAccount(String),

    /// The key escapes the namespace or contains an invalid segment.
    #[error("Storage: invalid key '{0}'")]
    InvalidKey(String),

    /// A month filter or bucket month was not `YYYY-MM`.
    #[error("Storage: invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    /// JSON serialization or deserialization failure.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem error.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote object store rejected or failed a request.
    #[error("Storage: backend error during {op}: {message}")]
    Backend { op: &'static str, message: String },

    /// A config update was rejected before anything was written.
    #[error("Storage: config update rejected: {0}")]
    InvalidConfig(ConfigUpdateError),

    /// The remote object store cannot be used (no credentials, unreachable bucket).
    #[error("Storage: remote store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
