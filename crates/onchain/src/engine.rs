//! Subscription lifecycle and webhook-delivery handling.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use hookflow_core::error::CoreError;
use hookflow_core::filters::matches_offchain;
use hookflow_core::hook::{EventMonitor, Hook, HookStatus, TriggerType};
use hookflow_core::run::RunSummary;
use hookflow_core::store::HookStore;
use hookflow_core::trigger::TriggerContext;
use hookflow_core::types::DbId;
use hookflow_engine::executor::HookExecutor;

use crate::decode::{decode_log, undecoded_event, RawLog};
use crate::error::OnchainError;
use crate::provider::ProviderApi;
use crate::query::{build_filter_query, monitor_topic0, network_for_chain, validate_callback_url};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Deployment-level settings for the on-chain engine.
#[derive(Debug, Clone)]
pub struct OnchainSettings {
    /// Public base URL of this deployment; the per-hook callback path is
    /// appended to it.
    pub callback_base_url: String,
    /// Enforce HTTPS/public-host callback rules.
    pub production: bool,
}

impl OnchainSettings {
    fn callback_url(&self, hook_id: DbId) -> String {
        format!(
            "{}/api/v1/webhooks/onchain/{hook_id}",
            self.callback_base_url.trim_end_matches('/')
        )
    }
}

// ---------------------------------------------------------------------------
// OnchainEngine
// ---------------------------------------------------------------------------

/// Keeps provider subscriptions in sync with hook configuration and feeds
/// matched deliveries into the hook executor.
pub struct OnchainEngine {
    store: Arc<dyn HookStore>,
    provider: Arc<dyn ProviderApi>,
    executor: Arc<HookExecutor>,
    settings: OnchainSettings,
}

impl OnchainEngine {
    pub fn new(
        store: Arc<dyn HookStore>,
        provider: Arc<dyn ProviderApi>,
        executor: Arc<HookExecutor>,
        settings: OnchainSettings,
    ) -> Self {
        Self {
            store,
            provider,
            executor,
            settings,
        }
    }

    // -- subscription lifecycle ---------------------------------------------

    /// Register a provider subscription for an onchain hook and persist the
    /// returned subscription id.
    pub async fn register_subscription(
        &self,
        hook_id: DbId,
        user_id: DbId,
    ) -> Result<String, OnchainError> {
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
            ))
            .into());
        }
        let Some(onchain) = hook.onchain() else {
            return Err(OnchainError::Validation(format!(
                "Hook {hook_id} is not an onchain hook"
            )));
        };

        let network = network_for_chain(onchain.chain_id)?;
        let callback_url = self.settings.callback_url(hook_id);
        validate_callback_url(&callback_url, self.settings.production)?;

        let query = build_filter_query(&onchain.monitors)?;

        let subscription_id = self
            .provider
            .create_log_subscription(&query, &callback_url, network)
            .await?;

        self.store
            .update_hook_subscription_id(hook_id, Some(&subscription_id))
            .await?;

        tracing::info!(
            hook_id,
            subscription_id = %subscription_id,
            network,
            monitors = onchain.monitors.len(),
            "Onchain subscription registered"
        );
        Ok(subscription_id)
    }

    /// Tear down a hook's provider subscription. Best-effort: failures are
    /// logged, never raised. Synthetic (manually provisioned) ids are skipped.
    pub async fn unregister_subscription(&self, hook: &Hook) {
        let Some(subscription_id) = hook.subscription_id.as_deref() else {
            return;
        };
        if is_synthetic_subscription(subscription_id) {
            tracing::debug!(
                hook_id = hook.id,
                subscription_id,
                "Skipping deletion of manually provisioned subscription"
            );
            return;
        }

        if let Err(e) = self.provider.delete_log_subscription(subscription_id).await {
            tracing::warn!(
                hook_id = hook.id,
                subscription_id,
                error = %e,
                "Failed to delete provider subscription"
            );
            return;
        }
        if let Err(e) = self
            .store
            .update_hook_subscription_id(hook.id, None)
            .await
        {
            tracing::warn!(hook_id = hook.id, error = %e, "Failed to clear subscription id");
        }
    }

    // -- delivery handling ---------------------------------------------------

    /// Handle one provider webhook delivery for a hook.
    ///
    /// Each log that matches a monitor, decodes, and passes its off-chain
    /// filters becomes one sequential executor run. Per-log problems are
    /// dropped and logged, never fatal to the batch.
    pub async fn handle_delivery(
        &self,
        hook_id: DbId,
        payload: &Value,
    ) -> Result<Vec<RunSummary>, OnchainError> {
        let hook = self
            .store
            .get_hook(hook_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Hook",
                id: hook_id,
            })?;

        if !hook.is_active || hook.status != HookStatus::Active {
            return Err(OnchainError::Validation(format!(
                "Hook {hook_id} is not active"
            )));
        }
        let Some(onchain) = hook.onchain() else {
            return Err(OnchainError::Validation(format!(
                "Hook {hook_id} is not an onchain hook"
            )));
        };
        if hook.trigger_type != TriggerType::Onchain {
            return Err(OnchainError::Validation(format!(
                "Hook {hook_id} trigger type is '{}', expected 'onchain'",
                hook.trigger_type
            )));
        }

        let logs = extract_logs(payload);
        if logs.is_empty() {
            // Providers send empty-block notifications even when asked not
            // to; nothing to do.
            tracing::debug!(hook_id, "Empty onchain delivery, ignoring");
            return Ok(Vec::new());
        }

        let received_at = Utc::now();
        let mut summaries = Vec::new();

        for log in &logs {
            let Some(monitor) = match_monitor(&onchain.monitors, log) else {
                tracing::debug!(
                    hook_id,
                    address = %log.address,
                    "Log address matches no configured monitor, dropping"
                );
                continue;
            };

            let event = match &monitor.event_abi {
                Some(abi) => match decode_log(abi, log) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(
                            hook_id,
                            event = %monitor.event_name,
                            error = %e,
                            "Dropping undecodable log"
                        );
                        continue;
                    }
                },
                None => undecoded_event(&monitor.event_name, log),
            };

            if !matches_offchain(&event.params, &monitor.filters) {
                tracing::debug!(
                    hook_id,
                    event = %event.name,
                    "Event excluded by off-chain filters"
                );
                continue;
            }

            let trigger = TriggerContext::new(
                TriggerType::Onchain,
                serde_json::json!({
                    "event": event.to_value(),
                    "log": log.to_value(),
                    "receivedAt": received_at.to_rfc3339(),
                }),
            );

            // One run per matched event, in log order, sequentially: runs of
            // the same delivery must not interleave their side effects.
            let summary = self.executor.execute_hook(&hook, Some(trigger)).await;
            summaries.push(summary);
        }

        tracing::info!(
            hook_id,
            logs = logs.len(),
            runs = summaries.len(),
            "Onchain delivery processed"
        );
        Ok(summaries)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Manually provisioned subscription ids are marked with this prefix and are
/// never deleted through the API.
fn is_synthetic_subscription(subscription_id: &str) -> bool {
    subscription_id.starts_with("manual_")
}

/// Pull the log array out of a provider delivery payload.
///
/// Malformed entries are skipped; the payload shape beyond `logs` is opaque
/// to us.
fn extract_logs(payload: &Value) -> Vec<RawLog> {
    let raw = payload
        .get("logs")
        .or_else(|| payload.get("event").and_then(|e| e.get("logs")))
        .and_then(Value::as_array);

    let Some(raw) = raw else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(log) => Some(log),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed log entry");
                None
            }
        })
        .collect()
}

/// Find the monitor responsible for a log.
///
/// Address comparison is case-insensitive. When several monitors watch the
/// same contract, the log's topic 0 picks the right event; monitors without
/// an ABI match on address alone.
fn match_monitor<'a>(monitors: &'a [EventMonitor], log: &RawLog) -> Option<&'a EventMonitor> {
    let by_address: Vec<&EventMonitor> = monitors
        .iter()
        .filter(|m| m.address.eq_ignore_ascii_case(log.address.trim()))
        .collect();

    if let Some(topic0) = log.topic0() {
        if let Some(exact) = by_address
            .iter()
            .copied()
            .find(|m| m.event_abi.is_some() && monitor_topic0(m) == topic0)
        {
            return Some(exact);
        }
    }
    by_address
        .iter()
        .copied()
        .find(|m| m.event_abi.is_none())
        .or_else(|| by_address.first().copied())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
