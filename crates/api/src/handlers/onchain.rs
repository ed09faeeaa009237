//! Handlers for the on-chain subscription lifecycle and provider callbacks.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use hookflow_core::types::DbId;

use crate::auth::CallerIdentity;
use crate::error::AppResult;
use crate::handlers::hooks::{ensure_owner, load_hook};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /hooks/{id}/subscription
// ---------------------------------------------------------------------------

/// Register the provider log subscription for an onchain hook.
pub async fn register_subscription(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    caller: CallerIdentity,
) -> AppResult<impl IntoResponse> {
    let subscription_id = state
        .onchain
        .register_subscription(id, caller.user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: json!({ "subscriptionId": subscription_id }),
        }),
    ))
}

// ---------------------------------------------------------------------------
// DELETE /hooks/{id}/subscription
// ---------------------------------------------------------------------------

/// Tear down the provider subscription. Best-effort on the provider side;
/// always succeeds from the caller's point of view once ownership checks
/// pass.
pub async fn unregister_subscription(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    caller: CallerIdentity,
) -> AppResult<impl IntoResponse> {
    let hook = load_hook(&state, id).await?;
    ensure_owner(&hook, caller)?;

    state.onchain.unregister_subscription(&hook).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /webhooks/onchain/{id}
// ---------------------------------------------------------------------------

/// Provider delivery callback: decode, filter, and execute matched events.
pub async fn handle_delivery(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let summaries = state.onchain.handle_delivery(id, &payload).await?;

    let run_ids: Vec<&str> = summaries.iter().map(|s| s.run_id.as_str()).collect();
    Ok(Json(DataResponse {
        data: json!({
            "processed": summaries.len(),
            "runIds": run_ids,
        }),
    }))
}
