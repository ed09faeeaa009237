//! Telegram chat-message action.

use serde_json::Value;

use hookflow_core::hook::{ActionType, TelegramAction};
use hookflow_core::interpolate::{interpolate, InterpolationMode};

use crate::clients::{ChatApi, MarkupSerializer};
use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::retry::{default_timeout, execute_with_retry, execute_with_timeout, MAX_ATTEMPTS};

/// Execute one chat-message action.
///
/// Resolves the configured chat target to a numeric id when it isn't one
/// already, interpolates the message template, converts the markup to plain
/// text plus formatting spans, and sends with retry and timeout.
pub async fn execute(
    chat: &dyn ChatApi,
    markup: &dyn MarkupSerializer,
    config: &TelegramAction,
    ctx: &ExecutionContext<'_>,
) -> Result<(Value, u32), EngineError> {
    let target = config.chat.trim();
    if target.is_empty() {
        return Err(EngineError::Config(
            "Telegram action requires a chat target".to_string(),
        ));
    }

    // Numeric targets (including negative group ids) are used as-is;
    // anything else goes through a handle lookup.
    let chat_id = match target.parse::<i64>() {
        Ok(id) => id,
        Err(_) => chat.resolve_chat_id(target).await.map_err(|e| {
            EngineError::Chat(format!("Could not resolve chat target '{target}': {e}"))
        })?,
    };

    let message = interpolate(&config.message, ctx.variables, InterpolationMode::Lenient)?;
    let (text, spans) = markup.serialize(&message);

    let timeout = default_timeout(ActionType::Telegram);
    let (sent, retries) = execute_with_retry(
        || execute_with_timeout(chat.send_message(chat_id, &text, &spans), timeout, ActionType::Telegram),
        ActionType::Telegram,
        MAX_ATTEMPTS,
    )
    .await?;

    tracing::debug!(
        hook_id = ctx.hook_id,
        run_id = ctx.run_id,
        chat_id,
        message_id = sent.message_id,
        "Telegram message delivered"
    );

    Ok((
        serde_json::json!({
            "messageId": sent.message_id,
            "chatId": sent.chat_id,
        }),
        retries,
    ))
}
