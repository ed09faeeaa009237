//! Collaborator interfaces consumed by the action executors.
//!
//! Concrete implementations live outside the engine: the Telegram crate for
//! chat delivery and markup serialization, the evm crate for chain access.
//! Tests substitute doubles.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Chat delivery
// ---------------------------------------------------------------------------

/// One formatting span over the plain text of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FormatSpan {
    /// Span kind in the provider's vocabulary (`bold`, `italic`, `code`,
    /// `text_link`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Offset into the plain text, in UTF-16 code units.
    pub offset: usize,
    pub length: usize,
    /// Target URL for link spans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Provider acknowledgement for a delivered message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message_id: i64,
    pub chat_id: i64,
}

/// Chat delivery API: handle resolution and message sending.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Resolve an @username-style handle to a numeric chat id.
    async fn resolve_chat_id(&self, handle: &str) -> Result<i64, EngineError>;

    /// Send a message with optional formatting spans.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        spans: &[FormatSpan],
    ) -> Result<SentMessage, EngineError>;
}

/// Conversion of interpolated markup into plain text plus formatting spans.
pub trait MarkupSerializer: Send + Sync {
    fn serialize(&self, markup: &str) -> (String, Vec<FormatSpan>);
}

// ---------------------------------------------------------------------------
// Chain access
// ---------------------------------------------------------------------------

/// One transaction-shaped request against a chain.
#[derive(Debug, Clone)]
pub struct ChainCall {
    pub chain_id: u64,
    /// Recipient: contract address for calls, transfer target for native
    /// value transfers.
    pub to: String,
    /// Native value in wei, as a decimal string.
    pub value_wei: Option<String>,
    /// Standard ABI JSON item for the target function, when calling one.
    pub function_abi: Option<Value>,
    /// Positional arguments, already interpolated, in string form.
    pub args: Vec<String>,
    /// Gas limit from a prior estimation, when available.
    pub gas_limit: Option<u64>,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub gas_used: u64,
    /// True when the transaction succeeded on-chain.
    pub status: bool,
    pub block_number: u64,
}

/// Blockchain client: gas estimation, signed submission, receipts, reads.
///
/// Signing and key custody live behind this trait; the engine only sees the
/// request/receipt shapes.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn estimate_gas(&self, call: &ChainCall) -> Result<u64, EngineError>;

    /// Sign and submit, returning the transaction hash.
    async fn send_transaction(&self, call: &ChainCall) -> Result<String, EngineError>;

    async fn wait_for_receipt(&self, chain_id: u64, tx_hash: &str)
        -> Result<TxReceipt, EngineError>;

    /// Read a view function's decoded return value.
    async fn read_function(
        &self,
        chain_id: u64,
        to: &str,
        function_abi: &Value,
        args: &[String],
    ) -> Result<Value, EngineError>;
}
