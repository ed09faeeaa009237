//! Event ABI fragments: canonical signatures, selectors, topic positions.
//!
//! The builder stores a minimal ABI fragment per monitored event. From it we
//! compute the canonical signature string (`Transfer(address,address,uint256)`),
//! the keccak-256 selector used as topic 0, and the topic position of each
//! indexed parameter.

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EventParam / EventAbi
// ---------------------------------------------------------------------------

/// One input parameter of an event ABI fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventParam {
    pub name: String,
    /// Solidity type, e.g. `address`, `uint256`, `bytes32`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub indexed: bool,
}

/// A single event's ABI fragment, as stored in monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAbi {
    pub name: String,
    pub inputs: Vec<EventParam>,
    #[serde(default)]
    pub anonymous: bool,
}

impl EventAbi {
    /// Canonical signature string, e.g. `Transfer(address,address,uint256)`.
    pub fn canonical_signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.kind.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// Keccak-256 hash of the canonical signature; topic 0 of emitted logs.
    pub fn selector(&self) -> B256 {
        keccak256(self.canonical_signature().as_bytes())
    }

    /// Topic position of the named parameter, if it is indexed.
    ///
    /// Topic 0 is reserved for the event selector, so positions start at 1
    /// and increment only across indexed parameters, in declaration order.
    /// Non-indexed parameters live in the data section and have no topic.
    pub fn topic_index_of(&self, parameter: &str) -> Option<usize> {
        let mut topic = 0usize;
        for input in &self.inputs {
            if input.indexed {
                topic += 1;
                if input.name == parameter {
                    return Some(topic);
                }
            } else if input.name == parameter {
                return None;
            }
        }
        None
    }

    /// Whether the named parameter exists and is indexed.
    pub fn is_indexed(&self, parameter: &str) -> bool {
        self.inputs.iter().any(|p| p.name == parameter && p.indexed)
    }
}

// ---------------------------------------------------------------------------
// Well-known signatures
// ---------------------------------------------------------------------------

/// Best-effort signature for common event names when no ABI is configured.
pub fn well_known_signature(event_name: &str) -> Option<&'static str> {
    match event_name {
        "Transfer" => Some("Transfer(address,address,uint256)"),
        "Approval" => Some("Approval(address,address,uint256)"),
        "ApprovalForAll" => Some("ApprovalForAll(address,address,bool)"),
        "TransferSingle" => Some("TransferSingle(address,address,address,uint256,uint256)"),
        "Deposit" => Some("Deposit(address,uint256)"),
        "Withdrawal" => Some("Withdrawal(address,uint256)"),
        _ => None,
    }
}

/// Keccak-256 selector for an arbitrary signature string.
pub fn signature_hash(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

// ---------------------------------------------------------------------------
// Decoded value rendering
// ---------------------------------------------------------------------------

/// Render a decoded Solidity value into JSON.
///
/// Addresses are checksummed, integers become decimal strings (they routinely
/// exceed JSON number precision), byte values become 0x-hex.
pub fn render_sol_value(value: &alloy_dyn_abi::DynSolValue) -> serde_json::Value {
    use alloy_dyn_abi::DynSolValue;
    use serde_json::Value;

    match value {
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Uint(n, _) => Value::String(n.to_string()),
        DynSolValue::Int(n, _) => Value::String(n.to_string()),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(b) => Value::String(alloy_primitives::hex::encode_prefixed(b)),
        DynSolValue::FixedBytes(word, size) => Value::String(
            alloy_primitives::hex::encode_prefixed(&word.as_slice()[..*size]),
        ),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(render_sol_value).collect())
        }
        other => Value::String(format!("{other:?}")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn canonical_signature_joins_types() {
        assert_eq!(
            transfer_abi().canonical_signature(),
            "Transfer(address,address,uint256)"
        );
    }

    #[test]
    fn selector_matches_known_transfer_topic() {
        // ERC-20 Transfer topic 0, a fixed point of the whole decoding path.
        let expected = "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
        assert_eq!(format!("{:x}", transfer_abi().selector()), expected);
    }

    #[test]
    fn topic_index_counts_indexed_params_only() {
        let abi = transfer_abi();
        assert_eq!(abi.topic_index_of("from"), Some(1));
        assert_eq!(abi.topic_index_of("to"), Some(2));
        // `value` is not indexed: no topic position.
        assert_eq!(abi.topic_index_of("value"), None);
    }

    #[test]
    fn topic_index_skips_unindexed_predecessors() {
        let abi = EventAbi {
            name: "Mixed".to_string(),
            inputs: vec![
                EventParam {
                    name: "a".to_string(),
                    kind: "uint256".to_string(),
                    indexed: false,
                },
                EventParam {
                    name: "b".to_string(),
                    kind: "address".to_string(),
                    indexed: true,
                },
            ],
            anonymous: false,
        };
        assert_eq!(abi.topic_index_of("b"), Some(1));
    }

    #[test]
    fn unknown_parameter_has_no_topic() {
        assert_eq!(transfer_abi().topic_index_of("missing"), None);
    }

    #[test]
    fn well_known_transfer_signature() {
        assert_eq!(
            well_known_signature("Transfer"),
            Some("Transfer(address,address,uint256)")
        );
        assert_eq!(well_known_signature("SomethingCustom"), None);
    }

    #[test]
    fn event_abi_deserializes_standard_json() {
        let json = serde_json::json!({
            "name": "Transfer",
            "inputs": [
                { "name": "from", "type": "address", "indexed": true },
                { "name": "to", "type": "address", "indexed": true },
                { "name": "value", "type": "uint256", "indexed": false }
            ]
        });
        let abi: EventAbi = serde_json::from_value(json).unwrap();
        assert_eq!(abi.inputs.len(), 3);
        assert_eq!(abi.inputs[2].kind, "uint256");
    }
}
