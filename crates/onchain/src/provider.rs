//! Provider webhook-subscription API.
//!
//! The provider manages log-filter subscriptions that deliver matching logs
//! to our callback URL. Only the small create/delete surface is modelled;
//! the trait keeps the engine testable without network access.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::OnchainError;
use crate::query::LogFilterQuery;

/// Subscription management surface of the log-delivery provider.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Create a log-filter subscription; returns the provider's
    /// subscription id.
    async fn create_log_subscription(
        &self,
        query: &LogFilterQuery,
        callback_url: &str,
        network: &str,
    ) -> Result<String, OnchainError>;

    /// Delete a subscription by id.
    async fn delete_log_subscription(&self, subscription_id: &str) -> Result<(), OnchainError>;
}

// ---------------------------------------------------------------------------
// ProviderClient
// ---------------------------------------------------------------------------

/// HTTP client for the provider's subscription REST API.
pub struct ProviderClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreateSubscriptionResponse {
    id: String,
}

impl ProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ProviderApi for ProviderClient {
    async fn create_log_subscription(
        &self,
        query: &LogFilterQuery,
        callback_url: &str,
        network: &str,
    ) -> Result<String, OnchainError> {
        let body = serde_json::json!({
            "network": network,
            "webhookUrl": callback_url,
            "addresses": query.addresses,
            "topics": query.topics,
            "skipEmptyMessages": query.skip_empty_deliveries,
        });

        let response = self
            .http
            .post(self.endpoint("v1/log-subscriptions"))
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OnchainError::Provider(format!("Subscription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &detail));
        }

        let created: CreateSubscriptionResponse = response
            .json()
            .await
            .map_err(|e| OnchainError::Provider(format!("Malformed subscription response: {e}")))?;

        tracing::info!(subscription_id = %created.id, network, "Provider subscription created");
        Ok(created.id)
    }

    async fn delete_log_subscription(&self, subscription_id: &str) -> Result<(), OnchainError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("v1/log-subscriptions/{subscription_id}")))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| OnchainError::Provider(format!("Unsubscribe request failed: {e}")))?;

        let status = response.status();
        // Already-gone subscriptions are fine; deletion is idempotent.
        if !status.is_success() && status.as_u16() != 404 {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &detail));
        }
        Ok(())
    }
}

/// Map a provider HTTP status to our error taxonomy.
fn classify_status(status: u16, detail: &str) -> OnchainError {
    match status {
        401 | 403 => OnchainError::Auth(format!("HTTP {status}: {detail}")),
        400 | 404 | 422 => OnchainError::Validation(format!("HTTP {status}: {detail}")),
        _ => OnchainError::Provider(format!("HTTP {status}: {detail}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(classify_status(401, ""), OnchainError::Auth(_)));
        assert!(matches!(classify_status(403, ""), OnchainError::Auth(_)));
        assert!(matches!(
            classify_status(422, "bad topics"),
            OnchainError::Validation(_)
        ));
        assert!(matches!(classify_status(500, ""), OnchainError::Provider(_)));
        assert!(matches!(classify_status(429, ""), OnchainError::Provider(_)));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = ProviderClient::new("https://api.example.com/", "key");
        assert_eq!(
            client.endpoint("v1/log-subscriptions"),
            "https://api.example.com/v1/log-subscriptions"
        );
    }
}
