use thiserror::Error;

/// Typed error hierarchy for chatrelay.
///
/// Use at module boundaries (backend calls, outbound delivery, config validation).
/// Internal/leaf functions can continue using `anyhow::Result`; the `Internal` variant
/// allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {message}")]
    Provider { message: String, retryable: bool },

    #[error("Rate limit exceeded")]
    RateLimit { retry_after: Option<u64> },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RelayError {
    /// Whether this error is transient and the operation could be retried later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::RateLimit { .. } | Self::Internal(_) => true,
            Self::Auth(_) | Self::Config(_) => false,
        }
    }

    /// Whether this error is a quota / too-many-requests signal from the backend.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }
}
