//! Postgres-backed implementation of the core `HookStore` trait.
//!
//! Loading a hook is where raw JSONB configuration crosses into the typed
//! domain model: trigger and action configs are parsed here, once, so the
//! engines never see untyped payloads. A row with an unknown type or
//! malformed config fails the load with a validation error.

use async_trait::async_trait;
use sqlx::PgPool;

use hookflow_core::error::CoreError;
use hookflow_core::hook::{
    Action, ActionConfig, Hook, HookStatus, TriggerConfig, TriggerType,
};
use hookflow_core::run::{RunMeta, RunStatus};
use hookflow_core::store::HookStore;
use hookflow_core::types::{DbId, Timestamp};

use crate::models::hook::{HookRow, StoredAction};
use crate::repositories::{HookRepo, HookRunRepo};

// ---------------------------------------------------------------------------
// Row → domain conversion
// ---------------------------------------------------------------------------

/// Parse a database row into the typed domain model.
pub fn hook_from_row(row: &HookRow) -> Result<Hook, CoreError> {
    let trigger_type = TriggerType::from_str(&row.trigger_type)?;
    let trigger = TriggerConfig::parse(trigger_type, &row.trigger_config)?;
    let status = HookStatus::from_str(&row.status)?;

    let stored: Vec<StoredAction> = serde_json::from_value(row.actions.clone())
        .map_err(|e| CoreError::Validation(format!("Invalid actions list: {e}")))?;
    let actions = stored
        .iter()
        .map(|a| {
            Ok(Action {
                id: a.id.clone(),
                order: a.order,
                name: a.name.clone(),
                config: ActionConfig::parse(&a.action_type, &a.config)?,
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;

    Ok(Hook {
        id: row.id,
        user_id: row.user_id,
        name: row.name.clone(),
        trigger_type,
        trigger,
        actions,
        is_active: row.is_active,
        status,
        last_executed_at: row.last_executed_at,
        subscription_id: row.subscription_id.clone(),
    })
}

fn db_err(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("Database error: {e}"))
}

fn meta_value(meta: &RunMeta) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(meta)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize run meta: {e}")))
}

// ---------------------------------------------------------------------------
// PgHookStore
// ---------------------------------------------------------------------------

/// The production store, shared via `Arc<dyn HookStore>`.
pub struct PgHookStore {
    pool: PgPool,
}

impl PgHookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HookStore for PgHookStore {
    async fn get_hook(&self, id: DbId) -> Result<Option<Hook>, CoreError> {
        let row = HookRepo::find_by_id(&self.pool, id).await.map_err(db_err)?;
        row.as_ref().map(hook_from_row).transpose()
    }

    async fn create_run(
        &self,
        run_id: &str,
        hook_id: DbId,
        status: RunStatus,
        triggered_at: Timestamp,
        meta: &RunMeta,
    ) -> Result<(), CoreError> {
        HookRunRepo::create(
            &self.pool,
            run_id,
            hook_id,
            status.as_str(),
            triggered_at,
            &meta_value(meta)?,
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_run(
        &self,
        run_id: &str,
        status: RunStatus,
        completed_at: Timestamp,
        meta: &RunMeta,
        error: Option<&str>,
    ) -> Result<(), CoreError> {
        HookRunRepo::finish(
            &self.pool,
            run_id,
            status.as_str(),
            completed_at,
            &meta_value(meta)?,
            error,
        )
        .await
        .map_err(db_err)
    }

    async fn update_hook_last_executed(
        &self,
        hook_id: DbId,
        at: Timestamp,
    ) -> Result<(), CoreError> {
        HookRepo::update_last_executed(&self.pool, hook_id, at)
            .await
            .map_err(db_err)
    }

    async fn update_hook_subscription_id(
        &self,
        hook_id: DbId,
        subscription_id: Option<&str>,
    ) -> Result<(), CoreError> {
        HookRepo::update_subscription_id(&self.pool, hook_id, subscription_id)
            .await
            .map_err(db_err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn row(trigger_type: &str, trigger_config: serde_json::Value, actions: serde_json::Value) -> HookRow {
        HookRow {
            id: 1,
            user_id: 7,
            name: "transfers".to_string(),
            trigger_type: trigger_type.to_string(),
            trigger_config,
            actions,
            is_active: true,
            status: "active".to_string(),
            subscription_id: None,
            last_executed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn full_row_parses_into_domain_hook() {
        let row = row(
            "onchain",
            json!({
                "chainId": 1,
                "monitors": [{ "address": "0xabc", "eventName": "Transfer" }]
            }),
            json!([
                {
                    "id": "notify",
                    "order": 0,
                    "type": "telegram",
                    "config": { "chat": "@alerts", "message": "hi" }
                },
                {
                    "id": "post",
                    "order": 1,
                    "type": "webhook",
                    "config": { "url": "https://example.com/h" }
                }
            ]),
        );
        let hook = hook_from_row(&row).unwrap();
        assert_eq!(hook.trigger_type, TriggerType::Onchain);
        assert_eq!(hook.actions.len(), 2);
        assert_eq!(hook.actions[1].order, 1);
        assert!(hook.onchain().is_some());
    }

    #[test]
    fn unknown_trigger_type_fails_load() {
        let row = row("carrier-pigeon", json!({}), json!([]));
        assert!(matches!(
            hook_from_row(&row),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn unknown_action_type_fails_load() {
        let row = row(
            "manual",
            json!({}),
            json!([{ "id": "x", "order": 0, "type": "fax", "config": {} }]),
        );
        let err = hook_from_row(&row).unwrap_err();
        assert!(err.to_string().contains("Invalid action type"));
    }

    #[test]
    fn malformed_action_config_fails_load() {
        let row = row(
            "manual",
            json!({}),
            json!([{ "id": "x", "order": 0, "type": "telegram", "config": { "chat": "@a" } }]),
        );
        assert!(hook_from_row(&row).is_err());
    }

    #[test]
    fn empty_action_list_parses() {
        let row = row("manual", json!({}), json!([]));
        let hook = hook_from_row(&row).unwrap();
        assert!(hook.actions.is_empty());
    }
}
