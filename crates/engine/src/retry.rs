//! Shared retry, timeout, and result-envelope helpers.
//!
//! Every action kind gets the same discipline: up to three attempts with
//! exponential backoff (1 s, 2 s, 4 s), a per-kind timeout raced against the
//! operation, and a canonical [`ActionExecutionResult`] envelope.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use hookflow_core::hook::ActionType;
use hookflow_core::run::{ActionExecutionResult, ActionStatus};
use hookflow_core::types::Timestamp;

use crate::error::EngineError;

/// Default number of attempts for retryable operations.
pub const MAX_ATTEMPTS: u32 = 3;

/// First backoff delay; doubles after each failed attempt.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Per-kind default timeout for a single action execution.
pub fn default_timeout(kind: ActionType) -> Duration {
    match kind {
        ActionType::Telegram => Duration::from_secs(10),
        ActionType::Webhook => Duration::from_secs(30),
        ActionType::Chain => Duration::from_secs(60),
        ActionType::ContractCall => Duration::from_secs(60),
    }
}

/// Attempt `op` up to `max_attempts` times with exponential backoff.
///
/// Returns the value and the number of retries consumed (0 when the first
/// attempt succeeds). Non-retryable errors and the final attempt's error
/// propagate unchanged.
pub async fn execute_with_retry<T, F, Fut>(
    mut op: F,
    kind: ActionType,
    max_attempts: u32,
) -> Result<(T, u32), EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = INITIAL_BACKOFF;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok((value, attempt - 1)),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                tracing::warn!(
                    attempt,
                    kind = %kind,
                    error = %e,
                    "Action attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("the final attempt always returns")
}

/// Race `fut` against a timer.
///
/// If the timer fires first the operation fails with a timeout error naming
/// the action kind and budget; otherwise the operation's own result or error
/// is returned.
pub async fn execute_with_timeout<T, Fut>(
    fut: Fut,
    timeout: Duration,
    kind: ActionType,
) -> Result<T, EngineError>
where
    Fut: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            kind,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Stamp the canonical result envelope for one attempted action.
#[allow(clippy::too_many_arguments)]
pub fn build_result(
    action_id: &str,
    kind: ActionType,
    started_at: Timestamp,
    status: ActionStatus,
    result: Option<Value>,
    error: Option<String>,
    retry_count: u32,
) -> ActionExecutionResult {
    let completed_at = Utc::now();
    ActionExecutionResult {
        action_id: action_id.to_string(),
        action_type: kind,
        status,
        started_at,
        completed_at,
        duration_ms: (completed_at - started_at).num_milliseconds(),
        result,
        error,
        retry_count,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
