use std::sync::Arc;

use hookflow_core::store::HookStore;
use hookflow_engine::executor::HookExecutor;
use hookflow_onchain::engine::OnchainEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: hookflow_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Typed hook/run store shared with the engines.
    pub store: Arc<dyn HookStore>,
    /// The hook execution engine.
    pub executor: Arc<HookExecutor>,
    /// The on-chain trigger engine.
    pub onchain: Arc<OnchainEngine>,
}
