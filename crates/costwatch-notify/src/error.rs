/// Errors raised while building or delivering report e-mails.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// SMTP settings are missing a required field or contain an invalid value.
    #[error("Notify: invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sender or recipient is not a valid mailbox.
    #[error("Notify: invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The message could not be assembled.
    #[error("Notify: failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// SMTP transport error.
    #[error("Notify: SMTP error: {0}")]
    Smtp(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
