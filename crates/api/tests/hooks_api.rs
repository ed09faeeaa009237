//! Integration tests for hook execution endpoints and run history.
//!
//! These tests only use hooks whose runs fail at the precondition stage
//! (zero actions) or never start, so no external service is contacted.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_as_user, post_json};
use serde_json::json;
use sqlx::PgPool;

use hookflow_db::models::hook::CreateHook;
use hookflow_db::repositories::HookRepo;

/// Insert a manual hook with no actions for the given user.
async fn seed_hook(pool: &PgPool, user_id: i64, trigger_type: &str, trigger_config: serde_json::Value) -> i64 {
    let row = HookRepo::create(
        pool,
        &CreateHook {
            user_id,
            name: "test hook".to_string(),
            trigger_type: trigger_type.to_string(),
            trigger_config,
            actions: json!([]),
            is_active: None,
            status: None,
        },
    )
    .await
    .expect("failed to seed hook");
    row.id
}

// ---------------------------------------------------------------------------
// POST /hooks/{id}/execute
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_requires_caller_identity(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/hooks/1/execute", None, &json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_missing_hook_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/hooks/999/execute", Some(7), &json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_foreign_hook_returns_403(pool: PgPool) {
    let hook_id = seed_hook(&pool, 7, "manual", json!({})).await;
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/hooks/{hook_id}/execute"),
        Some(8),
        &json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_persists_a_run_record(pool: PgPool) {
    let hook_id = seed_hook(&pool, 7, "manual", json!({})).await;

    // A hook with zero actions fails its precondition check, but the run is
    // still created and persisted in its terminal state.
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/hooks/{hook_id}/execute"),
        Some(7),
        &json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "failed");
    assert!(json["data"]["error"]
        .as_str()
        .unwrap()
        .contains("no configured actions"));
    let run_id = json["data"]["runId"].as_str().unwrap().to_string();
    assert!(run_id.starts_with("run_"));

    // The run shows up in the hook's history.
    let app = common::build_test_app(pool);
    let response = get_as_user(app, &format!("/api/v1/hooks/{hook_id}/runs"), 7).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let runs = json["data"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["id"], run_id.as_str());
    assert_eq!(runs[0]["status"], "failed");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn execute_rejects_unknown_source(pool: PgPool) {
    let hook_id = seed_hook(&pool, 7, "manual", json!({})).await;
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/hooks/{hook_id}/execute"),
        Some(7),
        &json!({ "source": "carrier-pigeon" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// POST /hooks/{id}/trigger
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_trigger_rejects_non_webhook_hooks(pool: PgPool) {
    let hook_id = seed_hook(&pool, 7, "manual", json!({})).await;
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/hooks/{hook_id}/trigger"),
        None,
        &json!({ "k": 1 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_trigger_enforces_shared_secret(pool: PgPool) {
    let hook_id = seed_hook(&pool, 7, "webhook", json!({ "secret": "s3cret" })).await;

    // No secret header: rejected.
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/hooks/{hook_id}/trigger"),
        None,
        &json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_trigger_without_secret_runs(pool: PgPool) {
    let hook_id = seed_hook(&pool, 7, "webhook", json!({})).await;
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/hooks/{hook_id}/trigger"),
        None,
        &json!({ "payload": 1 }),
    )
    .await;

    // Zero actions: the run is created and fails its precondition, which is
    // still a processed trigger from the caller's point of view.
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "failed");
}

// ---------------------------------------------------------------------------
// GET /runs/{run_id}
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn get_run_enforces_ownership(pool: PgPool) {
    let hook_id = seed_hook(&pool, 7, "manual", json!({})).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/hooks/{hook_id}/execute"),
        Some(7),
        &json!({}),
    )
    .await;
    let run_id = body_json(response).await["data"]["runId"]
        .as_str()
        .unwrap()
        .to_string();

    let app = common::build_test_app(pool.clone());
    let response = get_as_user(app, &format!("/api/v1/runs/{run_id}"), 8).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let response = get_as_user(app, &format!("/api/v1/runs/{run_id}"), 7).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn get_missing_run_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_as_user(app, "/api/v1/runs/run_0_none", 7).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
