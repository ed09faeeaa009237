//! Trigger contexts: the payload a trigger source hands to the executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hook::TriggerType;
use crate::types::Timestamp;

/// One trigger occurrence. Produced once per matched event or invocation and
/// consumed by exactly one executor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerContext {
    pub trigger_type: TriggerType,
    /// Type-specific payload: decoded event data, inbound request body,
    /// scheduler metadata, or whatever the manual caller supplied.
    pub data: Value,
    pub timestamp: Timestamp,
}

impl TriggerContext {
    pub fn new(trigger_type: TriggerType, data: Value) -> Self {
        Self {
            trigger_type,
            data,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Context for a manual invocation with no payload.
    pub fn manual() -> Self {
        Self::new(TriggerType::Manual, Value::Object(Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn manual_context_has_empty_payload() {
        let ctx = TriggerContext::manual();
        assert_eq!(ctx.trigger_type, TriggerType::Manual);
        assert!(ctx.data.as_object().unwrap().is_empty());
    }

    #[test]
    fn serializes_with_camel_case_tag() {
        let ctx = TriggerContext::new(TriggerType::Onchain, json!({ "x": 1 }));
        let v = serde_json::to_value(&ctx).unwrap();
        assert_eq!(v["triggerType"], "onchain");
        assert_eq!(v["data"]["x"], 1);
    }
}
