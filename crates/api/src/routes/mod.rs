//! Route tables.

pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{hooks, onchain};
use crate::state::AppState;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/hooks/{id}/execute", post(hooks::execute_hook))
        .route("/hooks/{id}/trigger", post(hooks::trigger_webhook))
        .route("/hooks/{id}/runs", get(hooks::list_runs))
        .route("/runs/{run_id}", get(hooks::get_run))
        .route(
            "/hooks/{id}/subscription",
            post(onchain::register_subscription).delete(onchain::unregister_subscription),
        )
        .route("/webhooks/onchain/{id}", post(onchain::handle_delivery))
}
