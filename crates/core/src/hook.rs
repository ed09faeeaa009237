//! Hook domain model: triggers, actions, and their typed configurations.
//!
//! A hook is one trigger wired to an ordered list of actions. Trigger and
//! action configurations arrive from the builder as JSON and are parsed into
//! closed enums here, at the persistence boundary, so the execution engine
//! never has to re-validate shapes it has already trusted. A row carrying an
//! unrecognized trigger or action type fails parsing with a validation error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::abi::EventAbi;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// TriggerType
// ---------------------------------------------------------------------------

/// The event source that starts a hook run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Onchain,
    Webhook,
    Cron,
    Manual,
}

impl TriggerType {
    /// Return the wire-format string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onchain => "onchain",
            Self::Webhook => "webhook",
            Self::Cron => "cron",
            Self::Manual => "manual",
        }
    }

    /// Parse from a wire-format string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "onchain" => Ok(Self::Onchain),
            "webhook" => Ok(Self::Webhook),
            "cron" => Ok(Self::Cron),
            "manual" => Ok(Self::Manual),
            _ => Err(CoreError::Validation(format!(
                "Invalid trigger_type: '{s}'. Must be one of: onchain, webhook, cron, manual"
            ))),
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HookStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a hook. Only `Active` hooks execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStatus {
    Active,
    Paused,
    Archived,
}

impl HookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "archived" => Ok(Self::Archived),
            _ => Err(CoreError::Validation(format!(
                "Invalid hook status: '{s}'. Must be one of: active, paused, archived"
            ))),
        }
    }
}

impl std::fmt::Display for HookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// The execution mechanism for one step in a hook's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Telegram,
    Webhook,
    ContractCall,
    Chain,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Webhook => "webhook",
            Self::ContractCall => "contract_call",
            Self::Chain => "chain",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "telegram" => Ok(Self::Telegram),
            "webhook" => Ok(Self::Webhook),
            "contract_call" => Ok(Self::ContractCall),
            "chain" => Ok(Self::Chain),
            _ => Err(CoreError::Validation(format!(
                "Invalid action type: '{s}'. Must be one of: telegram, webhook, contract_call, chain"
            ))),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FilterOperator
// ---------------------------------------------------------------------------

/// Comparison operator applied to one decoded event parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Contains => "contains",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "gte" => Ok(Self::Gte),
            "lte" => Ok(Self::Lte),
            "contains" => Ok(Self::Contains),
            _ => Err(CoreError::Validation(format!(
                "Invalid filter operator: '{s}'. Must be one of: eq, ne, gt, lt, gte, lte, contains"
            ))),
        }
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventFilter / EventMonitor
// ---------------------------------------------------------------------------

/// One filter on a decoded event parameter.
///
/// Filters with `indexed = true` and the `eq` operator are pushed into the
/// provider subscription as topic filters; everything else is evaluated
/// locally after decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    /// Name of the event parameter this filter applies to.
    pub parameter: String,
    /// Position of the parameter in the event's input list, if known.
    #[serde(default)]
    pub parameter_index: Option<usize>,
    pub operator: FilterOperator,
    /// Comparison value. Kept as raw JSON so numeric and string forms both
    /// survive the builder round-trip.
    pub value: serde_json::Value,
    #[serde(default)]
    pub indexed: bool,
}

/// One on-chain contract + event a hook watches, with its ABI and filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMonitor {
    /// Contract address, 0x-prefixed hex.
    pub address: String,
    pub event_name: String,
    #[serde(default)]
    pub event_abi: Option<EventAbi>,
    #[serde(default)]
    pub filters: Vec<EventFilter>,
}

// ---------------------------------------------------------------------------
// Trigger configurations
// ---------------------------------------------------------------------------

/// Configuration for an on-chain trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnchainTrigger {
    pub chain_id: u64,
    pub monitors: Vec<EventMonitor>,
}

/// Configuration for an inbound-webhook trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookTrigger {
    /// Optional shared secret the caller must present.
    #[serde(default)]
    pub secret: Option<String>,
}

/// Configuration for a schedule trigger. The schedule itself is owned by an
/// external scheduler that calls "execute hook now"; the expression is kept
/// for display and bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronTrigger {
    pub schedule: String,
}

/// Typed trigger configuration, one variant per trigger kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    Onchain(OnchainTrigger),
    Webhook(WebhookTrigger),
    Cron(CronTrigger),
    Manual,
}

/// Legacy single-event on-chain configuration, produced by older builder
/// versions. Normalized into a one-element monitor list on parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyOnchainTrigger {
    chain_id: u64,
    address: String,
    event_name: String,
    #[serde(default)]
    event_abi: Option<EventAbi>,
    #[serde(default)]
    filters: Vec<EventFilter>,
}

impl TriggerConfig {
    /// Parse a raw JSON trigger configuration for the given trigger type.
    ///
    /// On-chain configs accept both the multi-event `monitors` list and the
    /// legacy single-event shape, which is normalized to a one-element list.
    pub fn parse(trigger_type: TriggerType, config: &serde_json::Value) -> Result<Self, CoreError> {
        match trigger_type {
            TriggerType::Onchain => {
                if config.get("monitors").is_some() {
                    let cfg: OnchainTrigger = serde_json::from_value(config.clone())
                        .map_err(|e| CoreError::Validation(format!("Invalid onchain trigger config: {e}")))?;
                    if cfg.monitors.is_empty() {
                        return Err(CoreError::Validation(
                            "Onchain trigger must configure at least one event monitor".to_string(),
                        ));
                    }
                    Ok(Self::Onchain(cfg))
                } else {
                    let legacy: LegacyOnchainTrigger = serde_json::from_value(config.clone())
                        .map_err(|e| CoreError::Validation(format!("Invalid onchain trigger config: {e}")))?;
                    Ok(Self::Onchain(OnchainTrigger {
                        chain_id: legacy.chain_id,
                        monitors: vec![EventMonitor {
                            address: legacy.address,
                            event_name: legacy.event_name,
                            event_abi: legacy.event_abi,
                            filters: legacy.filters,
                        }],
                    }))
                }
            }
            TriggerType::Webhook => {
                let cfg: WebhookTrigger = serde_json::from_value(config.clone())
                    .map_err(|e| CoreError::Validation(format!("Invalid webhook trigger config: {e}")))?;
                Ok(Self::Webhook(cfg))
            }
            TriggerType::Cron => {
                let cfg: CronTrigger = serde_json::from_value(config.clone())
                    .map_err(|e| CoreError::Validation(format!("Invalid cron trigger config: {e}")))?;
                Ok(Self::Cron(cfg))
            }
            TriggerType::Manual => Ok(Self::Manual),
        }
    }
}

// ---------------------------------------------------------------------------
// Action configurations
// ---------------------------------------------------------------------------

/// Configuration for a Telegram chat-message action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramAction {
    /// Chat target: a numeric chat id or an @username-style handle.
    pub chat: String,
    /// Message template; `{path}` placeholders resolve against the run's
    /// variable context.
    pub message: String,
}

/// Configuration for an outbound HTTP webhook action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAction {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// Body template for methods that permit one.
    #[serde(default)]
    pub body: Option<String>,
}

/// Configuration for a smart-contract call action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallAction {
    pub address: String,
    pub chain_id: Option<u64>,
    /// When set, the action transfers native value instead of calling a
    /// function.
    #[serde(default)]
    pub is_native_transfer: bool,
    #[serde(default)]
    pub recipient: Option<String>,
    /// Transfer amount in wei, as a decimal string.
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
    /// Standard ABI JSON item for the target function.
    #[serde(default)]
    pub function_abi: Option<serde_json::Value>,
    /// Positional parameter values; strings may contain `{path}` placeholders.
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
}

/// Configuration for chaining into another hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAction {
    pub target_hook_id: DbId,
}

/// Typed action configuration, one variant per action kind.
///
/// The engine dispatches by matching on this enum; exhaustiveness checking
/// replaces a runtime "unknown action type" lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    Telegram(TelegramAction),
    Webhook(WebhookAction),
    ContractCall(ContractCallAction),
    Chain(ChainAction),
}

impl ActionConfig {
    /// Parse a raw JSON action configuration for the given action type string.
    pub fn parse(action_type: &str, config: &serde_json::Value) -> Result<Self, CoreError> {
        let kind = ActionType::from_str(action_type)?;
        let parsed = match kind {
            ActionType::Telegram => serde_json::from_value(config.clone()).map(Self::Telegram),
            ActionType::Webhook => serde_json::from_value(config.clone()).map(Self::Webhook),
            ActionType::ContractCall => {
                serde_json::from_value(config.clone()).map(Self::ContractCall)
            }
            ActionType::Chain => serde_json::from_value(config.clone()).map(Self::Chain),
        };
        parsed.map_err(|e| CoreError::Validation(format!("Invalid {kind} action config: {e}")))
    }

    /// The action kind this configuration belongs to.
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Telegram(_) => ActionType::Telegram,
            Self::Webhook(_) => ActionType::Webhook,
            Self::ContractCall(_) => ActionType::ContractCall,
            Self::Chain(_) => ActionType::Chain,
        }
    }
}

// ---------------------------------------------------------------------------
// Action / Hook
// ---------------------------------------------------------------------------

/// One step in a hook's pipeline. Immutable during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    /// 0-based position; contiguous across the hook's action list.
    pub order: i32,
    #[serde(default)]
    pub name: Option<String>,
    pub config: ActionConfig,
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        self.config.action_type()
    }
}

/// A user-defined automation: one trigger plus an ordered action list.
///
/// Created and edited by the builder; the execution core reads it and only
/// writes back `last_executed_at` and the provider subscription id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub trigger_type: TriggerType,
    pub trigger: TriggerConfig,
    pub actions: Vec<Action>,
    pub is_active: bool,
    pub status: HookStatus,
    pub last_executed_at: Option<Timestamp>,
    /// Provider-side log-filter subscription id, for onchain hooks.
    pub subscription_id: Option<String>,
}

impl Hook {
    /// The on-chain trigger configuration, if this is an onchain hook.
    pub fn onchain(&self) -> Option<&OnchainTrigger> {
        match &self.trigger {
            TriggerConfig::Onchain(cfg) => Some(cfg),
            _ => None,
        }
    }
}

/// Validate that action orders are 0-based and contiguous.
pub fn validate_action_order(actions: &[Action]) -> Result<(), CoreError> {
    for (i, action) in actions.iter().enumerate() {
        if action.order != i as i32 {
            return Err(CoreError::Validation(format!(
                "Action order must be contiguous: expected {i}, got {} for action '{}'",
                action.order, action.id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
