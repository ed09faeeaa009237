use hookflow_core::error::CoreError;

/// Error type for subscription management and delivery handling.
///
/// Authentication, validation, and transient provider failures are distinct
/// variants so callers can decide what is retryable and what is a
/// configuration problem.
#[derive(Debug, thiserror::Error)]
pub enum OnchainError {
    /// Invalid configuration or request shape. Not retryable.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The provider rejected our credentials.
    #[error("Provider authentication failed: {0}")]
    Auth(String),

    /// Transient provider failure (connectivity, rate limit, 5xx).
    #[error("Provider error: {0}")]
    Provider(String),

    /// A log payload could not be decoded against the configured ABI.
    #[error("Log decode failed: {0}")]
    Decode(String),

    /// A domain-level error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),
}
