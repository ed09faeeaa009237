//! Hook models and DTOs.
//!
//! Defines the database row struct for `hooks` and the create/update types
//! used by the repository and API layers. Trigger and action configuration
//! are stored as JSONB and parsed into typed domain structures when a hook
//! is loaded (see the store module).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hookflow_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A hook row from the `hooks` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HookRow {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub trigger_type: String,
    pub trigger_config: serde_json::Value,
    /// Ordered action list: `[{ id, order, type, name?, config }, ...]`.
    pub actions: serde_json::Value,
    pub is_active: bool,
    pub status: String,
    pub subscription_id: Option<String>,
    pub last_executed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One stored action element inside the `actions` JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAction {
    pub id: String,
    pub order: i32,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub name: Option<String>,
    pub config: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for creating a new hook record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHook {
    pub user_id: DbId,
    pub name: String,
    pub trigger_type: String,
    pub trigger_config: serde_json::Value,
    pub actions: serde_json::Value,
    pub is_active: Option<bool>,
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Input for updating an existing hook. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateHook {
    pub name: Option<String>,
    pub trigger_type: Option<String>,
    pub trigger_config: Option<serde_json::Value>,
    pub actions: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub status: Option<String>,
}
