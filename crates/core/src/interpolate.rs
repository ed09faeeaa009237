//! Template interpolation: `{path}` placeholders over a [`VariableContext`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::CoreError;
use crate::variables::VariableContext;

/// How unresolvable placeholders are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// Missing or null values render as the empty string.
    #[default]
    Lenient,
    /// Missing or null values abort the template with
    /// [`CoreError::MissingVariable`].
    Strict,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"))
}

/// Replace every `{path}` occurrence in `template` with its resolved value.
///
/// Values render as: strings verbatim, numbers and booleans in their JSON
/// form, objects and arrays as compact JSON. The function is side-effect
/// free: interpolating the same template against the same context twice
/// yields identical output.
pub fn interpolate(
    template: &str,
    context: &VariableContext,
    mode: InterpolationMode,
) -> Result<String, CoreError> {
    let re = placeholder_regex();
    let mut out = String::with_capacity(template.len());
    let mut last = 0usize;

    for caps in re.captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 always present");
        let path = caps
            .get(1)
            .expect("capture 1 always present")
            .as_str()
            .trim();

        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        match context.resolve(path) {
            Some(value) if !value.is_null() => out.push_str(&render(&value)),
            _ if mode == InterpolationMode::Strict => {
                return Err(CoreError::MissingVariable(path.to_string()));
            }
            _ => {} // lenient: empty string
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Textual form of a resolved value.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::ActionType;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn variable_round_trip() {
        let ctx = VariableContext::new(&json!({ "event": { "args": { "value": "100" } } }));
        let out = interpolate(
            "{trigger.event.args.value} tokens",
            &ctx,
            InterpolationMode::Lenient,
        )
        .unwrap();
        assert_eq!(out, "100 tokens");
    }

    #[test]
    fn multiple_placeholders_in_one_template() {
        let ctx = VariableContext::new(&json!({ "from": "0xA", "to": "0xB" }));
        let out = interpolate(
            "{trigger.from} -> {trigger.to}",
            &ctx,
            InterpolationMode::Lenient,
        )
        .unwrap();
        assert_eq!(out, "0xA -> 0xB");
    }

    #[test]
    fn numbers_and_bools_render_in_json_form() {
        let ctx = VariableContext::new(&json!({ "n": 42, "ok": true }));
        let out =
            interpolate("n={trigger.n} ok={trigger.ok}", &ctx, InterpolationMode::Lenient).unwrap();
        assert_eq!(out, "n=42 ok=true");
    }

    #[test]
    fn objects_render_as_compact_json() {
        let ctx = VariableContext::new(&json!({ "obj": { "a": 1 } }));
        let out = interpolate("{trigger.obj}", &ctx, InterpolationMode::Lenient).unwrap();
        assert_eq!(out, r#"{"a":1}"#);
    }

    #[test]
    fn lenient_missing_renders_empty() {
        let ctx = VariableContext::new(&json!({}));
        let out = interpolate("[{missing.path}]", &ctx, InterpolationMode::Lenient).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn strict_missing_raises_named_error() {
        let ctx = VariableContext::new(&json!({}));
        let err = interpolate("{missing.path}", &ctx, InterpolationMode::Strict).unwrap_err();
        assert!(err.to_string().contains("missing.path"));
    }

    #[test]
    fn strict_null_raises() {
        let ctx = VariableContext::new(&json!({ "gone": null }));
        assert!(interpolate("{trigger.gone}", &ctx, InterpolationMode::Strict).is_err());
    }

    #[test]
    fn idempotent_interpolation() {
        let mut ctx = VariableContext::new(&json!({ "v": "x" }));
        ctx.add_result(
            0,
            "a1",
            ActionType::Webhook,
            Some(json!({ "status": 200 })),
            None,
            Utc::now(),
        );
        let template = "{trigger.v}/{actions[0].status}";
        let first = interpolate(template, &ctx, InterpolationMode::Lenient).unwrap();
        let second = interpolate(template, &ctx, InterpolationMode::Lenient).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "x/200");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let ctx = VariableContext::new(&json!({}));
        let out = interpolate("no vars here", &ctx, InterpolationMode::Lenient).unwrap();
        assert_eq!(out, "no vars here");
    }

    #[test]
    fn action_alias_in_template() {
        let mut ctx = VariableContext::new(&json!({}));
        ctx.add_result(
            1,
            "notify",
            ActionType::Telegram,
            Some(json!({ "messageId": 99 })),
            None,
            Utc::now(),
        );
        let out = interpolate(
            "sent {action1.result.messageId} / {action_notify.messageId}",
            &ctx,
            InterpolationMode::Lenient,
        )
        .unwrap();
        assert_eq!(out, "sent 99 / 99");
    }
}
