//! Hook run models.
//!
//! Defines the database row struct for `hook_runs`. Run ids are strings
//! generated by the engine (`run_<millis>_<rand>`), not database serials,
//! so a run can be referenced before its terminal update lands.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hookflow_core::types::{DbId, Timestamp};

/// A hook run row from the `hook_runs` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HookRunRow {
    pub id: String,
    pub hook_id: DbId,
    pub status: String,
    pub triggered_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    /// Trigger snapshot, action results, totals.
    pub meta: serde_json::Value,
    pub error: Option<String>,
}
