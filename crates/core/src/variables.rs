//! Per-run variable context: flattened trigger data plus action results.
//!
//! The context gives templates three equivalent ways to address a prior
//! action's output (`actions[0].x`, `action0.x`, `action_<id>.x`) and dotted
//! access into the trigger payload. Built fresh for every run, mutated only
//! by appending one action's result after that action completes, and never
//! shared across runs.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::hook::ActionType;
use crate::types::Timestamp;

/// Arrays longer than this are stored whole but not exploded into per-index
/// keys, bounding placeholder churn on large payloads.
const MAX_EXPLODED_ARRAY_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Path segments
// ---------------------------------------------------------------------------

/// One step of a dotted/bracketed lookup path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Split a path like `actions[0].result.items[2].name` into segments.
///
/// Bracketed numeric indices may appear after any key. Malformed brackets
/// make the whole path unresolvable rather than panicking.
fn parse_segments(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }
        let mut rest = part;
        if let Some(bracket) = rest.find('[') {
            if bracket > 0 {
                segments.push(Segment::Key(rest[..bracket].to_string()));
            }
            rest = &rest[bracket..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped.find(']')?;
                let idx: usize = stripped[..close].parse().ok()?;
                segments.push(Segment::Index(idx));
                rest = &stripped[close + 1..];
            }
            if !rest.is_empty() {
                return None;
            }
        } else {
            segments.push(Segment::Key(rest.to_string()));
        }
    }
    Some(segments)
}

/// Walk `value` along the given segments.
fn traverse<'a>(mut value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    for segment in segments {
        value = match segment {
            Segment::Key(k) => value.get(k.as_str())?,
            Segment::Index(i) => value.get(*i)?,
        };
    }
    Some(value)
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// Flatten a JSON value into dotted keys, storing both every parent prefix
/// and every leaf path.
///
/// - `null` passes through unflattened at its own key.
/// - Arrays of length ≤ 10 are stored whole **and** exploded into `prefix[i]`
///   entries, recursing into object and array items.
/// - Longer arrays are stored whole only.
/// - Plain objects recurse; non-object values are stored as-is.
fn flatten_into(out: &mut Map<String, Value>, prefix: &str, value: &Value) {
    if !prefix.is_empty() {
        out.insert(prefix.to_string(), value.clone());
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(out, &child_prefix, child);
            }
        }
        Value::Array(items) if items.len() <= MAX_EXPLODED_ARRAY_LEN => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(out, &format!("{prefix}[{i}]"), item);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// VariableContext
// ---------------------------------------------------------------------------

/// Lookup structure exposing trigger data and prior action results to
/// templates.
#[derive(Debug, Clone)]
pub struct VariableContext {
    /// Flattened trigger payload: dotted keys plus the nested value at each
    /// prefix.
    trigger: Map<String, Value>,
    /// Per-action summaries in action-index order. Slots for skipped actions
    /// hold empty placeholders.
    actions: Vec<Value>,
    /// `action_<id>` alias → index into `actions`.
    id_aliases: HashMap<String, usize>,
}

impl VariableContext {
    /// Build a context from a trigger payload.
    ///
    /// Object payloads are flattened key by key; any other payload is exposed
    /// under the `payload` key.
    pub fn new(trigger_payload: &Value) -> Self {
        let mut trigger = Map::new();
        match trigger_payload {
            Value::Object(_) => flatten_into(&mut trigger, "", trigger_payload),
            other => flatten_into(&mut trigger, "payload", other),
        }
        Self {
            trigger,
            actions: Vec::new(),
            id_aliases: HashMap::new(),
        }
    }

    /// Insert a top-level trigger entry, used to enrich the context with run
    /// metadata (`hookId`, `runId`, `timestamp`) before interpolation.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.trigger.insert(key.to_string(), value);
    }

    /// Record the outcome of the action at `index`.
    ///
    /// Pads the list with empty placeholders if earlier slots are missing,
    /// then exposes the summary at `actions[index]`, `action{index}`, and
    /// (when the id is alias-safe) `action_{id}`.
    pub fn add_result(
        &mut self,
        index: usize,
        action_id: &str,
        action_type: ActionType,
        result: Option<Value>,
        error: Option<String>,
        timestamp: Timestamp,
    ) {
        while self.actions.len() <= index {
            self.actions.push(Value::Object(Map::new()));
        }
        let summary = serde_json::json!({
            "id": action_id,
            "type": action_type.as_str(),
            "result": result.unwrap_or(Value::Null),
            "error": error.map(Value::String).unwrap_or(Value::Null),
            "timestamp": timestamp.to_rfc3339(),
        });
        self.actions[index] = summary;

        if is_alias_safe(action_id) {
            self.id_aliases
                .insert(format!("action_{action_id}"), index);
        }
    }

    /// Number of recorded action slots.
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Resolve a lookup path to a value.
    ///
    /// Grammar, tried in order:
    /// - `trigger.<rest>` — flattened key first, then nested traversal;
    /// - `actions[n].<rest>` / `action<n>.<rest>` — index into the action
    ///   list, then traversal (falling back into the summary's `result`);
    /// - `action_<id>.<rest>` — id alias, same semantics;
    /// - a bare identifier — resolved directly against the trigger map;
    /// - anything else — resolved against the context root.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let segments = parse_segments(path)?;
        let (head, rest) = segments.split_first()?;

        match head {
            Segment::Key(k) if k == "trigger" => self.resolve_trigger(path, rest),
            Segment::Key(k) if k == "actions" => {
                let (idx, rest) = match rest.split_first()? {
                    (Segment::Index(i), tail) => (*i, tail),
                    _ => return None,
                };
                self.resolve_action(idx, rest)
            }
            Segment::Key(k) => {
                if let Some(idx) = numeric_alias(k) {
                    return self.resolve_action(idx, rest);
                }
                if let Some(idx) = self.id_aliases.get(k.as_str()) {
                    return self.resolve_action(*idx, rest);
                }
                if rest.is_empty() {
                    // Bare identifier: direct trigger lookup.
                    return self.trigger.get(k.as_str()).cloned();
                }
                self.resolve_root(&segments)
            }
            Segment::Index(_) => None,
        }
    }

    fn resolve_trigger(&self, full_path: &str, rest: &[Segment]) -> Option<Value> {
        if rest.is_empty() {
            return Some(Value::Object(self.trigger.clone()));
        }
        // Flattened key first: everything after "trigger.".
        let flat_key = full_path.strip_prefix("trigger.")?;
        if let Some(v) = self.trigger.get(flat_key) {
            return Some(v.clone());
        }
        let root = Value::Object(self.trigger.clone());
        traverse(&root, rest).cloned()
    }

    fn resolve_action(&self, index: usize, rest: &[Segment]) -> Option<Value> {
        let summary = self.actions.get(index)?;
        if rest.is_empty() {
            return Some(summary.clone());
        }
        if let Some(v) = traverse(summary, rest) {
            return Some(v.clone());
        }
        // Shorthand: `actions[0].status` reaches into the result payload.
        traverse(summary.get("result")?, rest).cloned()
    }

    fn resolve_root(&self, segments: &[Segment]) -> Option<Value> {
        let root = serde_json::json!({
            "trigger": Value::Object(self.trigger.clone()),
            "actions": Value::Array(self.actions.clone()),
        });
        traverse(&root, segments).cloned()
    }
}

/// Only ids of word characters and dashes get an `action_<id>` alias; other
/// ids would produce unparseable placeholder paths.
fn is_alias_safe(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Parse an `action<n>` numeric alias key.
fn numeric_alias(key: &str) -> Option<usize> {
    let digits = key.strip_prefix("action")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
