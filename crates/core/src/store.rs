//! Persistence interface consumed by the execution and trigger engines.
//!
//! The engines never touch the database directly: they talk to this trait,
//! implemented over Postgres in the db crate and by in-memory doubles in
//! tests.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::hook::Hook;
use crate::run::{RunMeta, RunStatus};
use crate::types::{DbId, Timestamp};

/// Repository-style store for hooks and their runs.
#[async_trait]
pub trait HookStore: Send + Sync {
    /// Load a hook with its parsed trigger and action configuration.
    async fn get_hook(&self, id: DbId) -> Result<Option<Hook>, CoreError>;

    /// Create a run record in `Pending` with the trigger snapshot in meta.
    async fn create_run(
        &self,
        run_id: &str,
        hook_id: DbId,
        status: RunStatus,
        triggered_at: Timestamp,
        meta: &RunMeta,
    ) -> Result<(), CoreError>;

    /// Move a run to its terminal state with the full meta blob.
    async fn update_run(
        &self,
        run_id: &str,
        status: RunStatus,
        completed_at: Timestamp,
        meta: &RunMeta,
        error: Option<&str>,
    ) -> Result<(), CoreError>;

    /// Stamp the hook's last execution time. Last-writer-wins.
    async fn update_hook_last_executed(
        &self,
        hook_id: DbId,
        at: Timestamp,
    ) -> Result<(), CoreError>;

    /// Persist (or clear) the provider subscription id for an onchain hook.
    async fn update_hook_subscription_id(
        &self,
        hook_id: DbId,
        subscription_id: Option<&str>,
    ) -> Result<(), CoreError>;
}
