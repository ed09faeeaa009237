use hookflow_core::error::CoreError;
use hookflow_core::hook::ActionType;

/// Error type for action execution and run orchestration.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid or missing action configuration. Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The action did not complete within its timeout budget.
    #[error("{kind} action timed out after {timeout_ms} ms")]
    Timeout { kind: ActionType, timeout_ms: u64 },

    /// The underlying HTTP request failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote endpoint answered with an error status.
    #[error("Endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// Chat delivery failure reported by the chat API.
    #[error("Chat delivery failed: {0}")]
    Chat(String),

    /// Blockchain client failure (RPC, signing, receipt).
    #[error("Chain client error: {0}")]
    Chain(String),

    /// A chained hook run completed with a failure. The child already went
    /// through its own retry discipline.
    #[error("Chained hook run failed: {0}")]
    Chained(String),

    /// A domain-level error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// Whether this error class is worth another attempt.
    ///
    /// Configuration errors fail immediately; transient I/O classes go back
    /// through the retry loop.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Core(_) | Self::Chained(_))
    }
}
