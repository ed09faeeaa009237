//! Outbound HTTP webhook action.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde_json::Value;

use hookflow_core::hook::{ActionType, WebhookAction};
use hookflow_core::interpolate::{interpolate, InterpolationMode};

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::retry::{default_timeout, execute_with_retry, execute_with_timeout, MAX_ATTEMPTS};

/// Execute one HTTP webhook action.
///
/// Validates the target URL, builds headers (JSON content type by default,
/// caller overrides merged in), interpolates the body template for methods
/// that permit one, and sends with retry and timeout. Any response status
/// ≥ 400 is a failure.
pub async fn execute(
    http: &reqwest::Client,
    config: &WebhookAction,
    ctx: &ExecutionContext<'_>,
) -> Result<(Value, u32), EngineError> {
    let url = Url::parse(config.url.trim())
        .map_err(|e| EngineError::Config(format!("Invalid webhook URL '{}': {e}", config.url)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(EngineError::Config(format!(
            "Webhook URL must be http(s), got '{}'",
            url.scheme()
        )));
    }

    let method = config
        .method
        .as_deref()
        .unwrap_or("POST")
        .to_ascii_uppercase();
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| EngineError::Config(format!("Invalid HTTP method '{method}'")))?;

    let headers = build_headers(config)?;
    let body = if method_permits_body(&method) {
        Some(build_body(config, ctx)?)
    } else {
        None
    };

    let timeout = default_timeout(ActionType::Webhook);
    let (payload, retries) = execute_with_retry(
        || {
            let mut request = http.request(method.clone(), url.clone()).headers(headers.clone());
            if let Some(ref body) = body {
                request = request.body(body.clone());
            }
            execute_with_timeout(send_once(request), timeout, ActionType::Webhook)
        },
        ActionType::Webhook,
        MAX_ATTEMPTS,
    )
    .await?;

    tracing::debug!(
        hook_id = ctx.hook_id,
        run_id = ctx.run_id,
        url = %url,
        status = payload["status"].as_u64(),
        "Webhook delivered"
    );

    Ok((payload, retries))
}

/// Default JSON content type, with caller-configured headers merged over it.
fn build_headers(config: &WebhookAction) -> Result<HeaderMap, EngineError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(overrides) = &config.headers {
        for (name, value) in overrides {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| EngineError::Config(format!("Invalid header name '{name}'")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| EngineError::Config(format!("Invalid header value for '{name:?}'")))?;
            headers.insert(name, value);
        }
    }
    Ok(headers)
}

/// Interpolated body template, or a default envelope when none is configured.
fn build_body(config: &WebhookAction, ctx: &ExecutionContext<'_>) -> Result<String, EngineError> {
    match &config.body {
        Some(template) => Ok(interpolate(template, ctx.variables, InterpolationMode::Lenient)?),
        None => {
            let envelope = serde_json::json!({
                "hookId": ctx.hook_id,
                "runId": ctx.run_id,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "trigger": ctx.trigger,
            });
            Ok(envelope.to_string())
        }
    }
}

fn method_permits_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// One request/response cycle, converted to the success payload shape.
async fn send_once(request: reqwest::RequestBuilder) -> Result<Value, EngineError> {
    let response = request.send().await?;
    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(EngineError::HttpStatus(status.as_u16()));
    }

    let response_headers: serde_json::Map<String, Value> = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let text = response.text().await?;
    let body = if is_json {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    } else {
        Value::String(text)
    };

    Ok(serde_json::json!({
        "status": status.as_u16(),
        "headers": response_headers,
        "body": body,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hookflow_core::variables::VariableContext;
    use std::collections::HashMap;

    fn config(url: &str) -> WebhookAction {
        WebhookAction {
            url: url.to_string(),
            method: None,
            headers: None,
            body: None,
        }
    }

    fn test_ctx<'a>(vars: &'a VariableContext, trigger: &'a Value) -> ExecutionContext<'a> {
        ExecutionContext {
            hook_id: 1,
            user_id: 1,
            run_id: "run_1_abc",
            trigger,
            variables: vars,
            ancestry: &[],
        }
    }

    #[tokio::test]
    async fn malformed_url_fails_as_config_error() {
        let http = reqwest::Client::new();
        let vars = VariableContext::new(&serde_json::json!({}));
        let trigger = serde_json::json!({});
        let err = execute(&http, &config("not a url"), &test_ctx(&vars, &trigger))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[tokio::test]
    async fn non_http_scheme_rejected() {
        let http = reqwest::Client::new();
        let vars = VariableContext::new(&serde_json::json!({}));
        let trigger = serde_json::json!({});
        let err = execute(&http, &config("ftp://example.com"), &test_ctx(&vars, &trigger))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn header_overrides_merge_over_default() {
        let mut overrides = HashMap::new();
        overrides.insert("X-Custom".to_string(), "yes".to_string());
        overrides.insert("Content-Type".to_string(), "text/plain".to_string());
        let cfg = WebhookAction {
            headers: Some(overrides),
            ..config("https://example.com")
        };
        let headers = build_headers(&cfg).unwrap();
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
        assert_eq!(headers.get("x-custom").unwrap(), "yes");
    }

    #[test]
    fn invalid_header_name_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("bad header\n".to_string(), "x".to_string());
        let cfg = WebhookAction {
            headers: Some(overrides),
            ..config("https://example.com")
        };
        assert!(build_headers(&cfg).is_err());
    }

    #[test]
    fn get_and_head_never_carry_a_body() {
        assert!(!method_permits_body(&Method::GET));
        assert!(!method_permits_body(&Method::HEAD));
        assert!(method_permits_body(&Method::POST));
        assert!(method_permits_body(&Method::PUT));
        assert!(method_permits_body(&Method::DELETE));
    }

    #[test]
    fn body_template_is_interpolated() {
        let vars = VariableContext::new(&serde_json::json!({ "value": "42" }));
        let trigger = serde_json::json!({ "value": "42" });
        let cfg = WebhookAction {
            body: Some(r#"{"amount":"{trigger.value}"}"#.to_string()),
            ..config("https://example.com")
        };
        let body = build_body(&cfg, &test_ctx(&vars, &trigger)).unwrap();
        assert_eq!(body, r#"{"amount":"42"}"#);
    }

    #[test]
    fn default_body_is_run_envelope() {
        let vars = VariableContext::new(&serde_json::json!({}));
        let trigger = serde_json::json!({ "k": 1 });
        let body = build_body(&config("https://example.com"), &test_ctx(&vars, &trigger)).unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["hookId"], 1);
        assert_eq!(parsed["runId"], "run_1_abc");
        assert_eq!(parsed["trigger"]["k"], 1);
    }
}
