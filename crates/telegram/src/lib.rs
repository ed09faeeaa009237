//! Telegram Bot API client for the chat-message action.
//!
//! Implements the engine's [`ChatApi`] trait: handle resolution via
//! `getChat` and delivery via `sendMessage` with entity spans produced by
//! [`markup::EntityMarkup`].

pub mod markup;

use async_trait::async_trait;
use serde::Deserialize;

use hookflow_engine::clients::{ChatApi, FormatSpan, SentMessage};
use hookflow_engine::error::EngineError;

// ---------------------------------------------------------------------------
// API response shapes
// ---------------------------------------------------------------------------

/// Standard Bot API envelope: `{ ok, result | description }`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatInfo {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    message_id: i64,
    chat: ChatInfo,
}

// ---------------------------------------------------------------------------
// TelegramClient
// ---------------------------------------------------------------------------

/// Bot API client. Cheap to clone is not needed; share via `Arc`.
pub struct TelegramClient {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, EngineError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await?;

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| EngineError::Chat(format!("Malformed Bot API response: {e}")))?;

        if !parsed.ok {
            return Err(EngineError::Chat(
                parsed
                    .description
                    .unwrap_or_else(|| format!("{method} returned ok=false")),
            ));
        }
        parsed
            .result
            .ok_or_else(|| EngineError::Chat(format!("{method} returned no result")))
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn resolve_chat_id(&self, handle: &str) -> Result<i64, EngineError> {
        // getChat accepts @username for public chats and channels.
        let username = if handle.starts_with('@') {
            handle.to_string()
        } else {
            format!("@{handle}")
        };
        let chat: ChatInfo = self
            .call("getChat", &serde_json::json!({ "chat_id": username }))
            .await?;
        Ok(chat.id)
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        spans: &[FormatSpan],
    ) -> Result<SentMessage, EngineError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if !spans.is_empty() {
            body["entities"] = serde_json::to_value(spans)
                .map_err(|e| EngineError::Chat(format!("Bad entity spans: {e}")))?;
        }

        let message: MessageInfo = self.call("sendMessage", &body).await?;
        tracing::debug!(
            chat_id,
            message_id = message.message_id,
            "Telegram message sent"
        );
        Ok(SentMessage {
            message_id: message.message_id,
            chat_id: message.chat.id,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_embeds_token_and_method() {
        let client = TelegramClient::new("123:ABC");
        assert_eq!(
            client.api_url("sendMessage"),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn ok_response_parses_result() {
        let raw = serde_json::json!({
            "ok": true,
            "result": { "id": -100123 }
        });
        let parsed: ApiResponse<ChatInfo> = serde_json::from_value(raw).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result.unwrap().id, -100123);
    }

    #[test]
    fn error_response_parses_description() {
        let raw = serde_json::json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        });
        let parsed: ApiResponse<ChatInfo> = serde_json::from_value(raw).unwrap();
        assert!(!parsed.ok);
        assert_eq!(
            parsed.description.as_deref(),
            Some("Bad Request: chat not found")
        );
    }

    #[test]
    fn sent_message_response_parses() {
        let raw = serde_json::json!({
            "ok": true,
            "result": {
                "message_id": 42,
                "chat": { "id": 777 },
                "date": 1700000000,
                "text": "hi"
            }
        });
        let parsed: ApiResponse<MessageInfo> = serde_json::from_value(raw).unwrap();
        let message = parsed.result.unwrap();
        assert_eq!(message.message_id, 42);
        assert_eq!(message.chat.id, 777);
    }

    #[test]
    fn format_spans_serialize_as_entities() {
        let spans = vec![FormatSpan {
            kind: "bold".to_string(),
            offset: 0,
            length: 4,
            url: None,
        }];
        let value = serde_json::to_value(&spans).unwrap();
        assert_eq!(value[0]["type"], "bold");
        assert_eq!(value[0]["offset"], 0);
        assert!(value[0].get("url").is_none());
    }
}
