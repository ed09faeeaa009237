//! Repository for the `hooks` table.

use sqlx::PgPool;

use hookflow_core::types::{DbId, Timestamp};

use crate::models::hook::{CreateHook, HookRow, UpdateHook};

/// Column list for hooks queries.
const COLUMNS: &str = "id, user_id, name, trigger_type, trigger_config, actions, \
    is_active, status, subscription_id, last_executed_at, created_at, updated_at";

/// Provides CRUD operations for hooks.
pub struct HookRepo;

impl HookRepo {
    /// Insert a new hook, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateHook) -> Result<HookRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO hooks
                (user_id, name, trigger_type, trigger_config, actions, is_active, status)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, true), COALESCE($7, 'active'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HookRow>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.trigger_type)
            .bind(&input.trigger_config)
            .bind(&input.actions)
            .bind(input.is_active)
            .bind(&input.status)
            .fetch_one(pool)
            .await
    }

    /// Find a hook by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<HookRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hooks WHERE id = $1");
        sqlx::query_as::<_, HookRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's hooks, newest first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<HookRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM hooks WHERE user_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, HookRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Update an existing hook. Returns the updated row, or `None` if not
    /// found.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateHook,
    ) -> Result<Option<HookRow>, sqlx::Error> {
        let query = format!(
            "UPDATE hooks SET
                name           = COALESCE($1, name),
                trigger_type   = COALESCE($2, trigger_type),
                trigger_config = COALESCE($3, trigger_config),
                actions        = COALESCE($4, actions),
                is_active      = COALESCE($5, is_active),
                status         = COALESCE($6, status),
                updated_at     = now()
             WHERE id = $7
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HookRow>(&query)
            .bind(&input.name)
            .bind(&input.trigger_type)
            .bind(&input.trigger_config)
            .bind(&input.actions)
            .bind(input.is_active)
            .bind(&input.status)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Stamp the hook's last execution time. Last-writer-wins by design.
    pub async fn update_last_executed(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE hooks SET last_executed_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Set or clear the provider subscription id.
    pub async fn update_subscription_id(
        pool: &PgPool,
        id: DbId,
        subscription_id: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE hooks SET subscription_id = $1 WHERE id = $2")
            .bind(subscription_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
