use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use hookflow_api::config::ServerConfig;
use hookflow_api::routes;
use hookflow_api::state::AppState;
use hookflow_core::store::HookStore;
use hookflow_db::store::PgHookStore;
use hookflow_engine::executor::HookExecutor;
use hookflow_evm::EvmChainClient;
use hookflow_onchain::engine::{OnchainEngine, OnchainSettings};
use hookflow_onchain::provider::ProviderClient;
use hookflow_telegram::markup::EntityMarkup;
use hookflow_telegram::TelegramClient;

/// A throwaway signer key, never funded anywhere.
const TEST_SIGNER_KEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_base_url: "http://localhost:3000".to_string(),
        production: false,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// Mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses. External
/// collaborators are real client instances pointed at unreachable targets;
/// tests must not execute actions that would call out.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();

    let store: Arc<dyn HookStore> = Arc::new(PgHookStore::new(pool.clone()));
    let executor = Arc::new(HookExecutor::new(
        Arc::clone(&store),
        Arc::new(TelegramClient::new("test-token")),
        Arc::new(EntityMarkup),
        Arc::new(EvmChainClient::new(TEST_SIGNER_KEY, HashMap::new()).unwrap()),
    ));
    let onchain = Arc::new(OnchainEngine::new(
        Arc::clone(&store),
        Arc::new(ProviderClient::new("http://localhost:1", "test-key")),
        Arc::clone(&executor),
        OnchainSettings {
            callback_base_url: config.public_base_url.clone(),
            production: config.production,
        },
    ));

    let state = AppState {
        pool,
        config: Arc::new(config),
        store,
        executor,
        onchain,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a GET request with a caller identity header.
pub async fn get_as_user(app: Router, uri: &str, user_id: i64) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("x-user-id", user_id.to_string())
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a JSON POST request, optionally with a caller identity header.
pub async fn post_json(
    app: Router,
    uri: &str,
    user_id: Option<i64>,
    body: &serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id.to_string());
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
