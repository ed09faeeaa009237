//! The hook executor: one state machine instance per run.
//!
//! A run moves `Pending → Success | Failed`. Actions execute strictly
//! sequentially because later templates may depend on earlier results, and
//! fail-fast must observe order. Action failures never propagate as errors
//! past this module; they become `ActionExecutionResult`s and stop the loop.

use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::{json, Value};

use hookflow_core::error::CoreError;
use hookflow_core::hook::{Action, ActionConfig, ActionType, ChainAction, Hook, HookStatus};
use hookflow_core::run::{
    generate_run_id, ActionExecutionResult, ActionStatus, RunMeta, RunStatus, RunSummary,
};
use hookflow_core::store::HookStore;
use hookflow_core::trigger::TriggerContext;
use hookflow_core::types::DbId;
use hookflow_core::variables::VariableContext;

use crate::actions;
use crate::clients::{ChainClient, ChatApi, MarkupSerializer};
use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::retry::{build_result, default_timeout, execute_with_timeout, MAX_ATTEMPTS};

// ---------------------------------------------------------------------------
// HookExecutor
// ---------------------------------------------------------------------------

/// Orchestrates end-to-end hook runs.
///
/// Constructed once at process start with its collaborators and shared via
/// `Arc`; holds no per-run state.
pub struct HookExecutor {
    store: Arc<dyn HookStore>,
    chat: Arc<dyn ChatApi>,
    markup: Arc<dyn MarkupSerializer>,
    chain: Arc<dyn ChainClient>,
    http: reqwest::Client,
}

impl HookExecutor {
    pub fn new(
        store: Arc<dyn HookStore>,
        chat: Arc<dyn ChatApi>,
        markup: Arc<dyn MarkupSerializer>,
        chain: Arc<dyn ChainClient>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            store,
            chat,
            markup,
            chain,
            http,
        }
    }

    /// Execute a hook for one trigger occurrence.
    ///
    /// Always produces a summary: run-setup failures become a terminal
    /// `Failed` run with zero action results rather than an error.
    pub async fn execute_hook(&self, hook: &Hook, trigger: Option<TriggerContext>) -> RunSummary {
        let trigger = trigger.unwrap_or_else(TriggerContext::manual);
        self.run_hook(hook, trigger, Vec::new()).await
    }

    /// Load a hook by id, enforce ownership, and execute it.
    pub async fn execute_hook_by_id(
        &self,
        hook_id: DbId,
        user_id: DbId,
        trigger: Option<TriggerContext>,
    ) -> Result<RunSummary, CoreError> {
        let hook = self
            .store
            .get_hook(hook_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Hook",
                id: hook_id,
            })?;
        if hook.user_id != user_id {
            return Err(CoreError::Forbidden(format!(
                "Hook {hook_id} does not belong to user {user_id}"
            )));
        }
        Ok(self.execute_hook(&hook, trigger).await)
    }

    /// One full run. Boxed so the chain action can recurse into it.
    fn run_hook<'a>(
        &'a self,
        hook: &'a Hook,
        trigger: TriggerContext,
        ancestry: Vec<DbId>,
    ) -> BoxFuture<'a, RunSummary> {
        Box::pin(async move {
            let run_id = generate_run_id();
            let triggered_at = Utc::now();
            let trigger_snapshot = serde_json::to_value(&trigger).unwrap_or(Value::Null);
            let meta = RunMeta::from_trigger(trigger_snapshot);

            tracing::info!(
                hook_id = hook.id,
                run_id = %run_id,
                trigger_type = %trigger.trigger_type,
                "Hook run started"
            );

            if let Err(e) = self
                .store
                .create_run(&run_id, hook.id, RunStatus::Pending, triggered_at, &meta)
                .await
            {
                tracing::error!(hook_id = hook.id, run_id = %run_id, error = %e, "Failed to create run record");
                return RunSummary {
                    run_id,
                    hook_id: hook.id,
                    status: RunStatus::Failed,
                    total_duration_ms: 0,
                    actions: Vec::new(),
                    failed_at: None,
                    error: Some(format!("Failed to create run record: {e}")),
                };
            }

            // Fatal setup path: precondition violations fail the run before
            // any executor is invoked.
            if let Some(reason) = precondition_failure(hook) {
                return self
                    .finish_run(hook, run_id, triggered_at, meta, Vec::new(), None, Some(reason))
                    .await;
            }

            let mut variables = VariableContext::new(&trigger.data);
            variables.insert("hookId", json!(hook.id));
            variables.insert("runId", json!(run_id.clone()));
            variables.insert("timestamp", json!(triggered_at.to_rfc3339()));

            let mut results: Vec<ActionExecutionResult> = Vec::new();
            let mut failed_at: Option<usize> = None;

            for (index, action) in hook.actions.iter().enumerate() {
                let ctx = ExecutionContext {
                    hook_id: hook.id,
                    user_id: hook.user_id,
                    run_id: &run_id,
                    trigger: &trigger.data,
                    variables: &variables,
                    ancestry: &ancestry,
                };
                let result = self.dispatch_action(action, &ctx).await;

                // Feed the outcome into the context either way, so templates
                // after a failure would still see its error and partial data.
                variables.add_result(
                    index,
                    &action.id,
                    action.action_type(),
                    result.result.clone(),
                    result.error.clone(),
                    result.completed_at,
                );

                let failed = result.is_failed();
                results.push(result);
                if failed {
                    failed_at = Some(index);
                    break;
                }
            }

            self.finish_run(hook, run_id, triggered_at, meta, results, failed_at, None)
                .await
        })
    }

    /// Dispatch one action to its kind-specific executor and convert the
    /// outcome into the canonical result envelope.
    async fn dispatch_action(
        &self,
        action: &Action,
        ctx: &ExecutionContext<'_>,
    ) -> ActionExecutionResult {
        let started_at = Utc::now();
        let kind = action.action_type();

        let outcome = match &action.config {
            ActionConfig::Telegram(cfg) => {
                actions::telegram::execute(self.chat.as_ref(), self.markup.as_ref(), cfg, ctx).await
            }
            ActionConfig::Webhook(cfg) => actions::webhook::execute(&self.http, cfg, ctx).await,
            ActionConfig::ContractCall(cfg) => {
                actions::contract::execute(self.chain.as_ref(), cfg, ctx).await
            }
            ActionConfig::Chain(cfg) => self.execute_chain(cfg, ctx).await,
        };

        match outcome {
            Ok((payload, retry_count)) => build_result(
                &action.id,
                kind,
                started_at,
                ActionStatus::Success,
                Some(payload),
                None,
                retry_count,
            ),
            Err(e) => {
                tracing::warn!(
                    hook_id = ctx.hook_id,
                    run_id = %ctx.run_id,
                    action_id = %action.id,
                    kind = %kind,
                    error = %e,
                    "Action failed"
                );
                build_result(
                    &action.id,
                    kind,
                    started_at,
                    ActionStatus::Failed,
                    None,
                    Some(e.to_string()),
                    retries_consumed(&e),
                )
            }
        }
    }

    /// Chain-to-hook action: a nested, synchronous run of the target hook.
    ///
    /// The invocation stack travels in the execution context; a target that
    /// is already on it is a cycle and fails the action instead of running.
    async fn execute_chain(
        &self,
        config: &ChainAction,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(Value, u32), EngineError> {
        let target_id = config.target_hook_id;
        if target_id <= 0 {
            return Err(EngineError::Config(
                "Chain action requires a target hook id".to_string(),
            ));
        }
        if target_id == ctx.hook_id || ctx.ancestry.contains(&target_id) {
            return Err(EngineError::Config(format!(
                "Chain action would create a cycle: hook {target_id} is already on the invocation stack"
            )));
        }

        let target = self
            .store
            .get_hook(target_id)
            .await?
            .ok_or_else(|| {
                EngineError::Config(format!("Chain target hook {target_id} not found"))
            })?;

        let chained_trigger = TriggerContext::new(
            hookflow_core::hook::TriggerType::Manual,
            json!({
                "chainedFrom": { "hookId": ctx.hook_id, "runId": ctx.run_id },
                "trigger": ctx.trigger,
            }),
        );

        let mut ancestry = ctx.ancestry.to_vec();
        ancestry.push(ctx.hook_id);

        let timeout = default_timeout(ActionType::Chain);
        let summary = execute_with_timeout(
            async { Ok(self.run_hook(&target, chained_trigger, ancestry).await) },
            timeout,
            ActionType::Chain,
        )
        .await?;

        if summary.status == RunStatus::Failed {
            return Err(EngineError::Chained(format!(
                "run {} of hook {target_id}: {}",
                summary.run_id,
                summary.error.as_deref().unwrap_or("unknown error")
            )));
        }

        Ok((
            json!({
                "targetHookId": target_id,
                "runId": summary.run_id,
                "status": summary.status.as_str(),
            }),
            0,
        ))
    }

    /// Persist the terminal run state and produce the caller-facing summary.
    #[allow(clippy::too_many_arguments)]
    async fn finish_run(
        &self,
        hook: &Hook,
        run_id: String,
        triggered_at: hookflow_core::types::Timestamp,
        mut meta: RunMeta,
        results: Vec<ActionExecutionResult>,
        failed_at: Option<usize>,
        setup_error: Option<String>,
    ) -> RunSummary {
        let completed_at = Utc::now();
        let total_duration_ms = (completed_at - triggered_at).num_milliseconds();

        let error = setup_error.or_else(|| {
            failed_at.map(|i| {
                results[i]
                    .error
                    .clone()
                    .unwrap_or_else(|| "Action failed".to_string())
            })
        });
        let status = if error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };

        meta.actions = results.clone();
        meta.total_duration_ms = Some(total_duration_ms);
        meta.failed_at = failed_at;

        if let Err(e) = self
            .store
            .update_run(&run_id, status, completed_at, &meta, error.as_deref())
            .await
        {
            tracing::error!(run_id = %run_id, error = %e, "Failed to persist terminal run state");
        }
        if let Err(e) = self
            .store
            .update_hook_last_executed(hook.id, completed_at)
            .await
        {
            tracing::error!(hook_id = hook.id, error = %e, "Failed to stamp last_executed_at");
        }

        match status {
            RunStatus::Failed => tracing::warn!(
                hook_id = hook.id,
                run_id = %run_id,
                failed_at = failed_at,
                error = error.as_deref(),
                total_duration_ms,
                "Hook run failed"
            ),
            _ => tracing::info!(
                hook_id = hook.id,
                run_id = %run_id,
                actions = results.len(),
                total_duration_ms,
                "Hook run completed"
            ),
        }

        RunSummary {
            run_id,
            hook_id: hook.id,
            status,
            total_duration_ms,
            actions: results,
            failed_at,
            error,
        }
    }
}

/// Check run preconditions; a violation fails the run with zero actions.
fn precondition_failure(hook: &Hook) -> Option<String> {
    if !hook.is_active {
        return Some("Hook is not active".to_string());
    }
    if hook.status != HookStatus::Active {
        return Some(format!(
            "Hook status is '{}', expected 'active'",
            hook.status
        ));
    }
    if hook.actions.is_empty() {
        return Some("Hook has no configured actions".to_string());
    }
    if let Err(e) = hookflow_core::hook::validate_action_order(&hook.actions) {
        return Some(e.to_string());
    }
    None
}

/// Retries consumed before an error became terminal. Non-retryable classes
/// fail on the first attempt.
fn retries_consumed(error: &EngineError) -> u32 {
    if error.is_retryable() {
        MAX_ATTEMPTS - 1
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
