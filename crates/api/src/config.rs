//! Configuration loaded from environment variables.

use std::collections::HashMap;

/// Server configuration.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Public base URL of this deployment, used to build provider callback
    /// URLs.
    pub public_base_url: String,
    /// Production mode: enforces HTTPS/public-host callback rules.
    pub production: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:3000`    |
    /// | `ENVIRONMENT`          | `development`              |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into());

        let production = std::env::var("ENVIRONMENT")
            .map(|e| e.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_base_url,
            production,
        }
    }
}

/// Settings for the execution engine's external collaborators.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Telegram Bot API token.
    pub telegram_bot_token: String,
    /// Base URL of the provider's subscription API.
    pub provider_api_base: String,
    /// API key for the provider.
    pub provider_api_key: String,
    /// Hex private key of the platform signer.
    pub signer_private_key: String,
    /// Chain id → JSON-RPC endpoint.
    pub rpc_urls: HashMap<u64, String>,
}

impl EngineConfig {
    /// Load engine settings; the credential variables are required.
    ///
    /// `RPC_URLS` uses `chainId=url` pairs separated by commas, e.g.
    /// `1=https://rpc.example/eth,137=https://rpc.example/polygon`.
    pub fn from_env() -> Self {
        let telegram_bot_token =
            std::env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN must be set");
        let provider_api_base = std::env::var("PROVIDER_API_BASE")
            .unwrap_or_else(|_| "https://dashboard.alchemy.com/api".into());
        let provider_api_key =
            std::env::var("PROVIDER_API_KEY").expect("PROVIDER_API_KEY must be set");
        let signer_private_key =
            std::env::var("SIGNER_PRIVATE_KEY").expect("SIGNER_PRIVATE_KEY must be set");
        let rpc_urls = parse_rpc_urls(&std::env::var("RPC_URLS").unwrap_or_default());

        Self {
            telegram_bot_token,
            provider_api_base,
            provider_api_key,
            signer_private_key,
            rpc_urls,
        }
    }
}

/// Parse the `RPC_URLS` pair list. Malformed pairs are skipped with a
/// warning rather than failing startup.
pub fn parse_rpc_urls(raw: &str) -> HashMap<u64, String> {
    let mut urls = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((chain, url)) if !url.trim().is_empty() => match chain.trim().parse::<u64>() {
                Ok(chain_id) => {
                    urls.insert(chain_id, url.trim().to_string());
                }
                Err(_) => tracing::warn!(pair, "Ignoring RPC_URLS entry with bad chain id"),
            },
            _ => tracing::warn!(pair, "Ignoring malformed RPC_URLS entry"),
        }
    }
    urls
}
