//! Smart-contract call action.

use serde_json::Value;

use hookflow_core::hook::{ActionType, ContractCallAction};
use hookflow_core::interpolate::{interpolate, InterpolationMode};

use crate::actions::is_hex_address;
use crate::clients::{ChainCall, ChainClient};
use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::retry::{default_timeout, execute_with_timeout};

/// Execute one contract-call action.
///
/// Branches on the native-transfer flag: transfers validate recipient and
/// amount and move value; function calls require a name and ABI, and
/// best-effort read back a return value when the function declares outputs.
/// Both paths estimate gas, sign and send, and wait for a receipt under the
/// action's timeout budget. Transactions are not idempotent, so there is no
/// retry loop around submission.
pub async fn execute(
    chain: &dyn ChainClient,
    config: &ContractCallAction,
    ctx: &ExecutionContext<'_>,
) -> Result<(Value, u32), EngineError> {
    let chain_id = config.chain_id.ok_or_else(|| {
        EngineError::Config("Contract call requires a configured chain id".to_string())
    })?;
    if !is_hex_address(config.address.trim()) {
        return Err(EngineError::Config(format!(
            "Invalid contract address '{}'",
            config.address
        )));
    }

    let args = resolve_params(&config.params, ctx)?;
    let timeout = default_timeout(ActionType::ContractCall);

    let payload = execute_with_timeout(
        run_call(chain, config, chain_id, args),
        timeout,
        ActionType::ContractCall,
    )
    .await?;

    tracing::debug!(
        hook_id = ctx.hook_id,
        run_id = ctx.run_id,
        chain_id,
        tx_hash = payload["transactionHash"].as_str(),
        "Contract transaction confirmed"
    );

    Ok((payload, 0))
}

async fn run_call(
    chain: &dyn ChainClient,
    config: &ContractCallAction,
    chain_id: u64,
    args: Vec<String>,
) -> Result<Value, EngineError> {
    let mut call = if config.is_native_transfer {
        build_transfer_call(config, chain_id)?
    } else {
        build_function_call(config, chain_id, args.clone())?
    };

    let gas = chain.estimate_gas(&call).await?;
    call.gas_limit = Some(gas);

    let tx_hash = chain.send_transaction(&call).await?;
    let receipt = chain.wait_for_receipt(chain_id, &tx_hash).await?;

    let mut payload = serde_json::json!({
        "transactionHash": receipt.tx_hash,
        "gasUsed": receipt.gas_used,
        "status": receipt.status,
        "blockNumber": receipt.block_number,
    });

    // Write functions usually aren't also readable; a failed read-back is
    // not an action failure.
    if !config.is_native_transfer {
        if let Some(abi) = config
            .function_abi
            .as_ref()
            .filter(|abi| declares_outputs(Some(abi)))
        {
            match chain
                .read_function(chain_id, config.address.trim(), abi, &args)
                .await
            {
                Ok(value) => {
                    payload["returnValue"] = value;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Return value read-back failed, ignoring");
                }
            }
        }
    }

    Ok(payload)
}

/// Native value transfer: recipient and integer wei amount are mandatory.
fn build_transfer_call(config: &ContractCallAction, chain_id: u64) -> Result<ChainCall, EngineError> {
    let recipient = config
        .recipient
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            EngineError::Config("Native transfer requires a recipient address".to_string())
        })?;
    if !is_hex_address(recipient) {
        return Err(EngineError::Config(format!(
            "Invalid transfer recipient '{recipient}'"
        )));
    }
    let amount = config
        .amount
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| EngineError::Config("Native transfer requires an amount".to_string()))?;
    if !amount.chars().all(|c| c.is_ascii_digit()) {
        return Err(EngineError::Config(format!(
            "Transfer amount must be an integer wei value, got '{amount}'"
        )));
    }

    Ok(ChainCall {
        chain_id,
        to: recipient.to_string(),
        value_wei: Some(amount.to_string()),
        function_abi: None,
        args: Vec::new(),
        gas_limit: None,
    })
}

/// Function call: name and ABI fragment are mandatory.
fn build_function_call(
    config: &ContractCallAction,
    chain_id: u64,
    args: Vec<String>,
) -> Result<ChainCall, EngineError> {
    let function_name = config
        .function_name
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| {
            EngineError::Config("Contract call requires a function name".to_string())
        })?;
    let function_abi = config.function_abi.clone().ok_or_else(|| {
        EngineError::Config(format!(
            "Contract call to '{function_name}' requires the function ABI"
        ))
    })?;

    Ok(ChainCall {
        chain_id,
        to: config.address.trim().to_string(),
        value_wei: None,
        function_abi: Some(function_abi),
        args,
        gas_limit: None,
    })
}

/// Interpolate `{path}` placeholders inside string parameters; other JSON
/// values pass through in their canonical string form.
fn resolve_params(
    params: &[Value],
    ctx: &ExecutionContext<'_>,
) -> Result<Vec<String>, EngineError> {
    params
        .iter()
        .map(|p| match p {
            Value::String(s) => {
                Ok(interpolate(s, ctx.variables, InterpolationMode::Lenient)?)
            }
            other => Ok(other.to_string()),
        })
        .collect()
}

/// Whether the ABI fragment declares any outputs worth reading back.
fn declares_outputs(function_abi: Option<&Value>) -> bool {
    function_abi
        .and_then(|abi| abi.get("outputs"))
        .and_then(Value::as_array)
        .is_some_and(|outputs| !outputs.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
