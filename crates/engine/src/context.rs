//! Per-action execution context.

use serde_json::Value;

use hookflow_core::types::DbId;
use hookflow_core::variables::VariableContext;

/// Everything an action executor may read while executing one step of a run.
///
/// The variable context is enriched with `hookId`, `runId`, and `timestamp`
/// before the first action executes, so templates can reference run metadata
/// alongside trigger data and prior results.
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    pub hook_id: DbId,
    pub user_id: DbId,
    pub run_id: &'a str,
    /// Raw trigger payload, as delivered by the trigger source.
    pub trigger: &'a Value,
    pub variables: &'a VariableContext,
    /// Hook ids on the current invocation stack, outermost first. Used by
    /// the chain action to refuse cycles.
    pub ancestry: &'a [DbId],
}
