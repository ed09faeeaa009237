//! Provider-side log filter queries.
//!
//! One combined query per hook: the union of monitored contract addresses,
//! the monitored events' signature hashes at topic 0, and — for indexed
//! parameters filtered with `eq` — value filters at their topic positions.

use alloy_primitives::{B256, U256};
use serde::Serialize;

use hookflow_core::abi::{signature_hash, well_known_signature, EventAbi};
use hookflow_core::filters::is_topic_filtered;
use hookflow_core::hook::EventMonitor;

use crate::error::OnchainError;

/// Maximum indexed-parameter topics an EVM log can carry (positions 1..=3).
const MAX_TOPIC_POSITIONS: usize = 3;

/// A provider log-filter query.
///
/// `topics[0]` holds the event signature hashes; positions 1..=3 hold
/// accepted values for the corresponding indexed parameter. `None` at a
/// position means "any value".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilterQuery {
    pub addresses: Vec<String>,
    pub topics: Vec<Option<Vec<String>>>,
    /// Ask the provider not to deliver empty-block notifications.
    pub skip_empty_deliveries: bool,
}

/// Build the combined filter query for a hook's event monitors.
pub fn build_filter_query(monitors: &[EventMonitor]) -> Result<LogFilterQuery, OnchainError> {
    if monitors.is_empty() {
        return Err(OnchainError::Validation(
            "At least one event monitor is required".to_string(),
        ));
    }

    let mut addresses: Vec<String> = Vec::new();
    let mut signatures: Vec<String> = Vec::new();
    let mut positional: Vec<Vec<String>> = vec![Vec::new(); MAX_TOPIC_POSITIONS];

    for monitor in monitors {
        let address = monitor.address.trim().to_lowercase();
        if address.is_empty() {
            return Err(OnchainError::Validation(format!(
                "Monitor for event '{}' has no contract address",
                monitor.event_name
            )));
        }
        if !addresses.contains(&address) {
            addresses.push(address);
        }

        let signature = event_signature(monitor);
        let hash = format!("{:#x}", signature_hash(&signature));
        if !signatures.contains(&hash) {
            signatures.push(hash);
        }

        // Push indexed `eq` filters into the query as topic filters. All
        // other filters are evaluated after decoding.
        for filter in monitor.filters.iter().filter(|f| is_topic_filtered(f)) {
            let Some(abi) = &monitor.event_abi else {
                tracing::warn!(
                    event = %monitor.event_name,
                    parameter = %filter.parameter,
                    "Indexed filter without an ABI cannot become a topic filter"
                );
                continue;
            };
            let Some(topic_index) = abi.topic_index_of(&filter.parameter) else {
                tracing::warn!(
                    event = %monitor.event_name,
                    parameter = %filter.parameter,
                    "Filter parameter is not an indexed ABI input, skipping topic filter"
                );
                continue;
            };
            let value = topic_value(&filter.value).ok_or_else(|| {
                OnchainError::Validation(format!(
                    "Filter value for '{}' cannot be encoded as a topic",
                    filter.parameter
                ))
            })?;
            let slot = &mut positional[topic_index - 1];
            if !slot.contains(&value) {
                slot.push(value);
            }
        }
    }

    // Trim trailing wildcard positions so the query is as short as possible.
    let mut topics: Vec<Option<Vec<String>>> = vec![Some(signatures)];
    let last_used = positional.iter().rposition(|v| !v.is_empty());
    if let Some(last) = last_used {
        for slot in positional.into_iter().take(last + 1) {
            topics.push(if slot.is_empty() { None } else { Some(slot) });
        }
    }

    Ok(LogFilterQuery {
        addresses,
        topics,
        skip_empty_deliveries: true,
    })
}

/// Canonical signature for a monitored event: ABI-derived when available,
/// else a well-known fallback, else a computed guess from the bare name.
pub fn event_signature(monitor: &EventMonitor) -> String {
    if let Some(abi) = &monitor.event_abi {
        return abi.canonical_signature();
    }
    if let Some(known) = well_known_signature(&monitor.event_name) {
        return known.to_string();
    }
    format!("{}()", monitor.event_name)
}

/// Signature hash for a monitor, usable as an expected topic 0.
pub fn monitor_topic0(monitor: &EventMonitor) -> B256 {
    monitor
        .event_abi
        .as_ref()
        .map(EventAbi::selector)
        .unwrap_or_else(|| signature_hash(&event_signature(monitor)))
}

/// Encode a filter value as a 32-byte topic word.
///
/// Hex values (addresses, hashes) are left-padded; decimal values are
/// treated as unsigned 256-bit integers.
fn topic_value(value: &serde_json::Value) -> Option<String> {
    let s = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => U256::from(*b as u8).to_string(),
        _ => return None,
    };
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.len() > 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return Some(format!("0x{:0>64}", hex.to_lowercase()));
    }
    let n = U256::from_str_radix(&s, 10).ok()?;
    Some(format!("{:#x}", B256::from(n)))
}

// ---------------------------------------------------------------------------
// Callback URL validation
// ---------------------------------------------------------------------------

/// Validate the delivery callback URL the provider will call.
///
/// In production the URL must be HTTPS and publicly reachable: localhost and
/// loopback hosts are rejected. Outside production, plain HTTP and local
/// hosts are allowed for development tunnels.
pub fn validate_callback_url(url: &str, production: bool) -> Result<(), OnchainError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| OnchainError::Validation(format!("Invalid callback URL '{url}': {e}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if !production => {}
        other => {
            return Err(OnchainError::Validation(format!(
                "Callback URL must use https, got '{other}'"
            )));
        }
    }

    if production {
        let host = parsed
            .host_str()
            .ok_or_else(|| OnchainError::Validation("Callback URL has no host".to_string()))?;
        let lowered = host.to_ascii_lowercase();
        let local = lowered == "localhost"
            || lowered.ends_with(".localhost")
            || lowered.ends_with(".local")
            || lowered == "127.0.0.1"
            || lowered == "0.0.0.0"
            || lowered == "[::1]"
            || lowered == "::1";
        if local {
            return Err(OnchainError::Validation(format!(
                "Callback URL host '{host}' is not publicly reachable"
            )));
        }
    }
    Ok(())
}

/// Provider network slug for a chain id.
pub fn network_for_chain(chain_id: u64) -> Result<&'static str, OnchainError> {
    match chain_id {
        1 => Ok("eth-mainnet"),
        11155111 => Ok("eth-sepolia"),
        137 => Ok("polygon-mainnet"),
        80002 => Ok("polygon-amoy"),
        8453 => Ok("base-mainnet"),
        84532 => Ok("base-sepolia"),
        10 => Ok("opt-mainnet"),
        42161 => Ok("arb-mainnet"),
        _ => Err(OnchainError::Validation(format!(
            "Unsupported chain id: {chain_id}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
