//! Handlers for hook execution and run history.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use hookflow_core::error::CoreError;
use hookflow_core::hook::{Hook, TriggerConfig, TriggerType};
use hookflow_core::trigger::TriggerContext;
use hookflow_core::types::DbId;
use hookflow_db::repositories::HookRunRepo;

use crate::auth::CallerIdentity;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /hooks/{id}/execute`.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    /// Optional trigger payload exposed to templates.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// `manual` (default) or `cron`, for scheduler-driven invocations.
    #[serde(default)]
    pub source: Option<String>,
}

/// Query parameters for run listing.
#[derive(Debug, Deserialize)]
pub struct RunListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// POST /hooks/{id}/execute
// ---------------------------------------------------------------------------

/// Execute a hook now, on behalf of its owner. Used by the UI's "run now"
/// button and by the external scheduler for cron hooks.
pub async fn execute_hook(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    caller: CallerIdentity,
    body: Option<Json<ExecuteRequest>>,
) -> AppResult<impl IntoResponse> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let trigger_type = match request.source.as_deref() {
        Some("cron") => TriggerType::Cron,
        Some("manual") | None => TriggerType::Manual,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Unknown trigger source '{other}'"
            )));
        }
    };
    let data = request
        .data
        .unwrap_or(serde_json::Value::Object(Default::default()));
    let trigger = TriggerContext::new(trigger_type, data);

    let summary = state
        .executor
        .execute_hook_by_id(id, caller.user_id, Some(trigger))
        .await?;

    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// POST /hooks/{id}/trigger
// ---------------------------------------------------------------------------

/// Inbound-webhook trigger entry point. Public, guarded by the hook's
/// optional shared secret.
pub async fn trigger_webhook(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let hook = load_hook(&state, id).await?;

    if hook.trigger_type != TriggerType::Webhook {
        return Err(AppError::BadRequest(format!(
            "Hook {id} is not a webhook-triggered hook"
        )));
    }
    if let TriggerConfig::Webhook(cfg) = &hook.trigger {
        if let Some(secret) = cfg.secret.as_deref() {
            let presented = headers
                .get("x-webhook-secret")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if presented != secret {
                return Err(AppError::Unauthorized(
                    "Invalid webhook secret".to_string(),
                ));
            }
        }
    }

    let trigger = TriggerContext::new(TriggerType::Webhook, payload);
    let summary = state.executor.execute_hook(&hook, Some(trigger)).await;

    tracing::info!(hook_id = id, run_id = %summary.run_id, status = %summary.status, "Webhook trigger processed");
    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// GET /hooks/{id}/runs
// ---------------------------------------------------------------------------

/// List a hook's run history, newest first.
pub async fn list_runs(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    caller: CallerIdentity,
    Query(params): Query<RunListParams>,
) -> AppResult<impl IntoResponse> {
    let hook = load_hook(&state, id).await?;
    ensure_owner(&hook, caller)?;

    let runs = HookRunRepo::list_for_hook(&state.pool, id, params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: runs }))
}

// ---------------------------------------------------------------------------
// GET /runs/{run_id}
// ---------------------------------------------------------------------------

/// Fetch a single run by its id.
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    caller: CallerIdentity,
) -> AppResult<impl IntoResponse> {
    let run = HookRunRepo::find_by_id(&state.pool, &run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))?;

    let hook = load_hook(&state, run.hook_id).await?;
    ensure_owner(&hook, caller)?;

    Ok(Json(DataResponse { data: run }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a parsed hook or return 404.
pub(crate) async fn load_hook(state: &AppState, id: DbId) -> AppResult<Hook> {
    state
        .store
        .get_hook(id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::NotFound { entity: "Hook", id }))
}

/// Reject callers that do not own the hook.
pub(crate) fn ensure_owner(hook: &Hook, caller: CallerIdentity) -> AppResult<()> {
    if hook.user_id != caller.user_id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Hook {} does not belong to user {}",
            hook.id, caller.user_id
        ))));
    }
    Ok(())
}
