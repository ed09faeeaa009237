//! Run records: the durable audit trail of hook executions.

use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::hook::ActionType;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// RunStatus / ActionStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a hook run. Created `Pending`, updated exactly once to a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::Validation(format!(
                "Invalid run status: '{s}'. Must be one of: pending, success, failed"
            ))),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
}

// ---------------------------------------------------------------------------
// ActionExecutionResult
// ---------------------------------------------------------------------------

/// One attempted action within a run. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionExecutionResult {
    pub action_id: String,
    pub action_type: ActionType,
    pub status: ActionStatus,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub duration_ms: i64,
    /// Kind-specific success payload.
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    /// Retries consumed inside the executor's own attempt loop.
    pub retry_count: u32,
}

impl ActionExecutionResult {
    pub fn is_failed(&self) -> bool {
        self.status == ActionStatus::Failed
    }
}

// ---------------------------------------------------------------------------
// RunMeta / RunSummary
// ---------------------------------------------------------------------------

/// The JSON meta blob persisted with a run: trigger snapshot, collected
/// action results, totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    pub trigger: Value,
    #[serde(default)]
    pub actions: Vec<ActionExecutionResult>,
    #[serde(default)]
    pub total_duration_ms: Option<i64>,
    /// Index of the first failed action, when execution stopped early.
    #[serde(default)]
    pub failed_at: Option<usize>,
}

impl RunMeta {
    pub fn from_trigger(trigger: Value) -> Self {
        Self {
            trigger,
            actions: Vec::new(),
            total_duration_ms: None,
            failed_at: None,
        }
    }
}

/// What `execute_hook` returns to its caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub hook_id: DbId,
    pub status: RunStatus,
    pub total_duration_ms: i64,
    pub actions: Vec<ActionExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Run id generation
// ---------------------------------------------------------------------------

/// Generate a run id: `run_<millis>_<6 alphanumeric chars>`.
pub fn generate_run_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("run_{millis}_{suffix}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
