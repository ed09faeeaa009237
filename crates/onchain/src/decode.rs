//! Decoding inbound log payloads against configured event ABIs.

use alloy_dyn_abi::EventExt;
use alloy_json_abi as json_abi;
use alloy_primitives::{hex, B256};
use serde::Deserialize;
use serde_json::{Map, Value};

use hookflow_core::abi::{render_sol_value, EventAbi};

use crate::error::OnchainError;

// ---------------------------------------------------------------------------
// RawLog
// ---------------------------------------------------------------------------

/// One log entry as delivered by the provider webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<Value>,
}

impl RawLog {
    /// Topic 0 as a 32-byte word, when present and well-formed.
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().and_then(|t| t.parse().ok())
    }

    /// The raw log as a JSON object, for the trigger payload.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "address": self.address,
            "topics": self.topics,
            "data": self.data,
            "transactionHash": self.transaction_hash,
            "blockNumber": self.block_number,
        })
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A decoded (or raw-fallback) event ready for filtering and templating.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub name: String,
    pub signature: String,
    /// Parameter name → rendered value. Empty for undecoded events.
    pub params: Map<String, Value>,
    /// False when the monitor had no ABI and only raw topics/data are known.
    pub decoded: bool,
}

impl DecodedEvent {
    /// JSON shape exposed to templates under `trigger.event`.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "signature": self.signature,
            "args": Value::Object(self.params.clone()),
            "decoded": self.decoded,
        })
    }
}

/// Decode one log against an event ABI fragment.
///
/// Indexed parameters come from the topic words, everything else from the
/// data section; both are zipped back to their declared names.
pub fn decode_log(abi: &EventAbi, log: &RawLog) -> Result<DecodedEvent, OnchainError> {
    let event = to_alloy_event(abi);

    let topics: Vec<B256> = log
        .topics
        .iter()
        .map(|t| {
            t.parse::<B256>()
                .map_err(|e| OnchainError::Decode(format!("Bad topic '{t}': {e}")))
        })
        .collect::<Result<_, _>>()?;

    let data = match log.data.as_deref() {
        Some(d) if !d.is_empty() => hex::decode(d)
            .map_err(|e| OnchainError::Decode(format!("Bad log data: {e}")))?,
        _ => Vec::new(),
    };

    let decoded = event
        .decode_log_parts(topics, &data)
        .map_err(|e| OnchainError::Decode(format!("ABI mismatch for '{}': {e}", abi.name)))?;

    let mut params = Map::new();
    let mut indexed_values = decoded.indexed.into_iter();
    let mut body_values = decoded.body.into_iter();
    for input in &abi.inputs {
        let value = if input.indexed {
            indexed_values.next()
        } else {
            body_values.next()
        };
        let Some(value) = value else {
            return Err(OnchainError::Decode(format!(
                "Decoded value count does not match ABI inputs for '{}'",
                abi.name
            )));
        };
        params.insert(input.name.clone(), render_sol_value(&value));
    }

    Ok(DecodedEvent {
        name: abi.name.clone(),
        signature: abi.canonical_signature(),
        params,
        decoded: true,
    })
}

/// Fallback record for monitors without an ABI: raw topics and data only.
pub fn undecoded_event(event_name: &str, log: &RawLog) -> DecodedEvent {
    DecodedEvent {
        name: event_name.to_string(),
        signature: String::new(),
        params: Map::new(),
        decoded: false,
    }
    .with_raw(log)
}

impl DecodedEvent {
    fn with_raw(mut self, log: &RawLog) -> Self {
        self.params
            .insert("topics".to_string(), serde_json::json!(log.topics));
        self.params
            .insert("data".to_string(), serde_json::json!(log.data));
        self
    }
}

/// Convert our stored ABI fragment into an alloy event definition.
fn to_alloy_event(abi: &EventAbi) -> json_abi::Event {
    json_abi::Event {
        name: abi.name.clone(),
        inputs: abi
            .inputs
            .iter()
            .map(|p| json_abi::EventParam {
                ty: p.kind.clone(),
                name: p.name.clone(),
                indexed: p.indexed,
                components: Vec::new(),
                internal_type: None,
            })
            .collect(),
        anonymous: abi.anonymous,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hookflow_core::abi::EventParam;

    fn transfer_abi() -> EventAbi {
        EventAbi {
            name: "Transfer".to_string(),
            inputs: vec![
                EventParam {
                    name: "from".to_string(),
                    kind: "address".to_string(),
                    indexed: true,
                },
                EventParam {
                    name: "to".to_string(),
                    kind: "address".to_string(),
                    indexed: true,
                },
                EventParam {
                    name: "value".to_string(),
                    kind: "uint256".to_string(),
                    indexed: false,
                },
            ],
            anonymous: false,
        }
    }

    fn transfer_log() -> RawLog {
        RawLog {
            address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
            topics: vec![
                // keccak256("Transfer(address,address,uint256)")
                "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef".to_string(),
                "0x0000000000000000000000001111111111111111111111111111111111111111".to_string(),
                "0x0000000000000000000000002222222222222222222222222222222222222222".to_string(),
            ],
            // 1 ETH in wei: 0xde0b6b3a7640000
            data: Some(
                "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000".to_string(),
            ),
            transaction_hash: Some("0xabc".to_string()),
            block_number: Some(serde_json::json!(19000000)),
        }
    }

    #[test]
    fn transfer_log_decodes_to_named_params() {
        let event = decode_log(&transfer_abi(), &transfer_log()).unwrap();

        assert!(event.decoded);
        assert_eq!(event.name, "Transfer");
        assert_eq!(event.signature, "Transfer(address,address,uint256)");
        assert_eq!(
            event.params["from"].as_str().unwrap().to_lowercase(),
            "0x1111111111111111111111111111111111111111"
        );
        assert_eq!(
            event.params["to"].as_str().unwrap().to_lowercase(),
            "0x2222222222222222222222222222222222222222"
        );
        assert_eq!(event.params["value"], "1000000000000000000");
    }

    #[test]
    fn wrong_topic_count_is_a_decode_error() {
        let mut log = transfer_log();
        log.topics.truncate(2);
        assert!(decode_log(&transfer_abi(), &log).is_err());
    }

    #[test]
    fn malformed_topic_is_a_decode_error() {
        let mut log = transfer_log();
        log.topics[1] = "0x1234".to_string();
        assert!(decode_log(&transfer_abi(), &log).is_err());
    }

    #[test]
    fn undecoded_fallback_carries_raw_topics_and_data() {
        let log = transfer_log();
        let event = undecoded_event("Transfer", &log);
        assert!(!event.decoded);
        assert_eq!(event.params["topics"].as_array().unwrap().len(), 3);
        assert!(event.params["data"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn event_value_shape_for_templates() {
        let event = decode_log(&transfer_abi(), &transfer_log()).unwrap();
        let value = event.to_value();
        assert_eq!(value["args"]["value"], "1000000000000000000");
        assert_eq!(value["name"], "Transfer");
    }
}
