//! EVM implementation of the engine's [`ChainClient`] trait.
//!
//! One client serves every configured chain: requests carry a chain id that
//! selects the RPC endpoint, and a single local signer funds the platform
//! wallet on all of them. Key custody beyond an environment-provided private
//! key is out of scope here.

use std::collections::HashMap;
use std::time::Duration;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy_dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde_json::Value;

use hookflow_core::abi::render_sol_value;
use hookflow_engine::clients::{ChainCall, ChainClient, TxReceipt};
use hookflow_engine::error::EngineError;

/// Receipt polling cadence. The engine's per-action timeout bounds the
/// overall wait.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const RECEIPT_POLL_ATTEMPTS: u32 = 60;

// ---------------------------------------------------------------------------
// EvmChainClient
// ---------------------------------------------------------------------------

/// Chain client backed by JSON-RPC providers and a local signer.
pub struct EvmChainClient {
    signer: PrivateKeySigner,
    rpc_urls: HashMap<u64, String>,
}

impl EvmChainClient {
    /// Build a client from a hex private key and a chain-id → RPC URL map.
    pub fn new(private_key: &str, rpc_urls: HashMap<u64, String>) -> Result<Self, EngineError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| EngineError::Chain(format!("Invalid signer key: {e}")))?;
        Ok(Self { signer, rpc_urls })
    }

    /// Address of the platform signer.
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    fn provider_for(&self, chain_id: u64) -> Result<impl Provider, EngineError> {
        let url = self.rpc_urls.get(&chain_id).ok_or_else(|| {
            EngineError::Chain(format!("No RPC endpoint configured for chain {chain_id}"))
        })?;
        let url = url
            .parse()
            .map_err(|e| EngineError::Chain(format!("Invalid RPC URL for chain {chain_id}: {e}")))?;
        let wallet = EthereumWallet::from(self.signer.clone());
        Ok(ProviderBuilder::new().wallet(wallet).connect_http(url))
    }

    fn build_request(&self, call: &ChainCall) -> Result<TransactionRequest, EngineError> {
        let to: Address = call
            .to
            .parse()
            .map_err(|e| EngineError::Config(format!("Invalid target address '{}': {e}", call.to)))?;

        let mut tx = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(to)
            .with_chain_id(call.chain_id);

        if let Some(value) = &call.value_wei {
            let wei = U256::from_str_radix(value, 10).map_err(|e| {
                EngineError::Config(format!("Invalid transfer amount '{value}': {e}"))
            })?;
            tx = tx.with_value(wei);
        }
        if let Some(abi) = &call.function_abi {
            tx = tx.with_input(encode_call(abi, &call.args)?);
        }
        if let Some(gas) = call.gas_limit {
            tx = tx.with_gas_limit(gas);
        }
        Ok(tx)
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn estimate_gas(&self, call: &ChainCall) -> Result<u64, EngineError> {
        let provider = self.provider_for(call.chain_id)?;
        let tx = self.build_request(call)?;
        provider
            .estimate_gas(tx)
            .await
            .map_err(|e| EngineError::Chain(format!("Gas estimation failed: {e}")))
    }

    async fn send_transaction(&self, call: &ChainCall) -> Result<String, EngineError> {
        let provider = self.provider_for(call.chain_id)?;
        let tx = self.build_request(call)?;
        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| EngineError::Chain(format!("Transaction submission failed: {e}")))?;
        let hash = *pending.tx_hash();
        tracing::debug!(chain_id = call.chain_id, tx_hash = %hash, "Transaction submitted");
        Ok(format!("{hash:#x}"))
    }

    async fn wait_for_receipt(
        &self,
        chain_id: u64,
        tx_hash: &str,
    ) -> Result<TxReceipt, EngineError> {
        let provider = self.provider_for(chain_id)?;
        let hash: B256 = tx_hash
            .parse()
            .map_err(|e| EngineError::Chain(format!("Invalid transaction hash '{tx_hash}': {e}")))?;

        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let receipt = provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| EngineError::Chain(format!("Receipt lookup failed: {e}")))?;
            if let Some(receipt) = receipt {
                return Ok(TxReceipt {
                    tx_hash: format!("{:#x}", receipt.transaction_hash),
                    gas_used: receipt.gas_used,
                    status: receipt.status(),
                    block_number: receipt.block_number.unwrap_or_default(),
                });
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
        Err(EngineError::Chain(format!(
            "Transaction {tx_hash} was not mined within the polling window"
        )))
    }

    async fn read_function(
        &self,
        chain_id: u64,
        to: &str,
        function_abi: &Value,
        args: &[String],
    ) -> Result<Value, EngineError> {
        let provider = self.provider_for(chain_id)?;
        let to: Address = to
            .parse()
            .map_err(|e| EngineError::Config(format!("Invalid contract address '{to}': {e}")))?;

        let function = parse_function(function_abi)?;
        let data = encode_call(function_abi, args)?;
        let tx = TransactionRequest::default().with_to(to).with_input(data);

        let raw = provider
            .call(tx)
            .await
            .map_err(|e| EngineError::Chain(format!("eth_call failed: {e}")))?;

        let outputs = function
            .abi_decode_output(&raw)
            .map_err(|e| EngineError::Chain(format!("Output decoding failed: {e}")))?;

        Ok(match outputs.as_slice() {
            [single] => render_sol_value(single),
            many => Value::Array(many.iter().map(render_sol_value).collect()),
        })
    }
}

// ---------------------------------------------------------------------------
// ABI helpers
// ---------------------------------------------------------------------------

fn parse_function(function_abi: &Value) -> Result<alloy_json_abi::Function, EngineError> {
    serde_json::from_value(function_abi.clone())
        .map_err(|e| EngineError::Config(format!("Invalid function ABI: {e}")))
}

/// Selector-prefixed calldata for a function call with string-form arguments.
fn encode_call(function_abi: &Value, args: &[String]) -> Result<Bytes, EngineError> {
    let function = parse_function(function_abi)?;
    if function.inputs.len() != args.len() {
        return Err(EngineError::Config(format!(
            "Function '{}' expects {} arguments, got {}",
            function.name,
            function.inputs.len(),
            args.len()
        )));
    }

    let values: Vec<DynSolValue> = function
        .inputs
        .iter()
        .zip(args)
        .map(|(input, arg)| {
            let ty = DynSolType::parse(&input.ty).map_err(|e| {
                EngineError::Config(format!("Unsupported parameter type '{}': {e}", input.ty))
            })?;
            ty.coerce_str(arg).map_err(|e| {
                EngineError::Config(format!(
                    "Argument '{arg}' is not a valid {}: {e}",
                    input.ty
                ))
            })
        })
        .collect::<Result<_, _>>()?;

    let encoded = function
        .abi_encode_input(&values)
        .map_err(|e| EngineError::Config(format!("Argument encoding failed: {e}")))?;
    Ok(encoded.into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer_abi() -> Value {
        json!({
            "name": "transfer",
            "type": "function",
            "stateMutability": "nonpayable",
            "inputs": [
                { "name": "to", "type": "address" },
                { "name": "value", "type": "uint256" }
            ],
            "outputs": [{ "name": "", "type": "bool" }]
        })
    }

    // A throwaway test key, never funded anywhere.
    const TEST_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn client_rejects_bad_signer_key() {
        assert!(EvmChainClient::new("not-a-key", HashMap::new()).is_err());
        assert!(EvmChainClient::new(TEST_KEY, HashMap::new()).is_ok());
    }

    #[test]
    fn encode_call_produces_selector_prefixed_calldata() {
        let data = encode_call(
            &transfer_abi(),
            &[
                "0x1111111111111111111111111111111111111111".to_string(),
                "1000000000000000000".to_string(),
            ],
        )
        .unwrap();
        // transfer(address,uint256) selector is 0xa9059cbb; 4 bytes selector
        // plus two 32-byte words.
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn encode_call_rejects_arity_mismatch() {
        let err = encode_call(&transfer_abi(), &["0x1111111111111111111111111111111111111111".to_string()])
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn encode_call_rejects_bad_argument() {
        let err = encode_call(
            &transfer_abi(),
            &["not-an-address".to_string(), "5".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn build_request_carries_value_and_gas() {
        let client = EvmChainClient::new(TEST_KEY, HashMap::new()).unwrap();
        let call = ChainCall {
            chain_id: 1,
            to: "0x2222222222222222222222222222222222222222".to_string(),
            value_wei: Some("1000000000000000000".to_string()),
            function_abi: None,
            args: Vec::new(),
            gas_limit: Some(21000),
        };
        let tx = client.build_request(&call).unwrap();
        assert_eq!(tx.value, Some(U256::from(10).pow(U256::from(18))));
        assert_eq!(tx.gas, Some(21000));
        assert_eq!(tx.chain_id, Some(1));
    }

    #[test]
    fn build_request_rejects_bad_address() {
        let client = EvmChainClient::new(TEST_KEY, HashMap::new()).unwrap();
        let call = ChainCall {
            chain_id: 1,
            to: "nowhere".to_string(),
            value_wei: None,
            function_abi: None,
            args: Vec::new(),
            gas_limit: None,
        };
        assert!(matches!(
            client.build_request(&call),
            Err(EngineError::Config(_))
        ));
    }
}
