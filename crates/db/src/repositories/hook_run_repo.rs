//! Repository for the `hook_runs` table.

use sqlx::PgPool;

use hookflow_core::types::{DbId, Timestamp};

use crate::models::hook_run::HookRunRow;

/// Column list for hook run queries.
const COLUMNS: &str = "id, hook_id, status, triggered_at, completed_at, meta, error";

/// Hard cap on run-history page size.
const MAX_RUN_PAGE: i64 = 200;

/// Provides persistence for hook runs.
pub struct HookRunRepo;

impl HookRunRepo {
    /// Insert a run record (typically in `pending`).
    pub async fn create(
        pool: &PgPool,
        run_id: &str,
        hook_id: DbId,
        status: &str,
        triggered_at: Timestamp,
        meta: &serde_json::Value,
    ) -> Result<HookRunRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO hook_runs (id, hook_id, status, triggered_at, meta)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HookRunRow>(&query)
            .bind(run_id)
            .bind(hook_id)
            .bind(status)
            .bind(triggered_at)
            .bind(meta)
            .fetch_one(pool)
            .await
    }

    /// Move a run to its terminal state.
    pub async fn finish(
        pool: &PgPool,
        run_id: &str,
        status: &str,
        completed_at: Timestamp,
        meta: &serde_json::Value,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE hook_runs
             SET status = $1, completed_at = $2, meta = $3, error = $4
             WHERE id = $5",
        )
        .bind(status)
        .bind(completed_at)
        .bind(meta)
        .bind(error)
        .bind(run_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a run by its id.
    pub async fn find_by_id(pool: &PgPool, run_id: &str) -> Result<Option<HookRunRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hook_runs WHERE id = $1");
        sqlx::query_as::<_, HookRunRow>(&query)
            .bind(run_id)
            .fetch_optional(pool)
            .await
    }

    /// List a hook's runs, newest first.
    pub async fn list_for_hook(
        pool: &PgPool,
        hook_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<HookRunRow>, sqlx::Error> {
        let limit = limit.unwrap_or(50).clamp(1, MAX_RUN_PAGE);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM hook_runs
             WHERE hook_id = $1
             ORDER BY triggered_at DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, HookRunRow>(&query)
            .bind(hook_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
