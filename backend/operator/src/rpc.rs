//! Ethereum JSON-RPC client.
//!
//! Every call is a single POST with a `json!` body and a typed response
//! envelope. Nothing is retried here: a failed call surfaces straight to the
//! command that issued it.
//!
//! Revert reasons are lifted out of node errors so a rejected call reports
//! the contract's own message (`Pausable: paused`, `PaymentSplitter: account
//! is not due payment`, ...) instead of a bare error code.

use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U256, U64};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{OperatorError, Result};

/// Selector of the solidity `Error(string)` revert payload.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

// ─────────────────────────────────────────────────────────
// Chain access
// ─────────────────────────────────────────────────────────

/// The node operations the operator needs.
#[async_trait]
pub trait Chain: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;
    /// Accounts the node can sign for.
    async fn accounts(&self) -> Result<Vec<Address>>;
    async fn gas_price(&self) -> Result<U256>;
    async fn transaction_count(&self, address: Address) -> Result<U256>;
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256>;
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes>;
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256>;
    /// Hand an unsigned transaction to the node's own wallet for signing.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256>;
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>>;
}

pub struct RpcClient {
    client: Client,
    url: String,
}

impl RpcClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Issue one request; a `null` result is returned as `None`.
    async fn request_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>> {
        debug!("RPC → {method} {params}");

        let body: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = body.error {
            return Err(classify_error(err));
        }
        Ok(body.result)
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        self.request_optional(method, params).await?.ok_or_else(|| OperatorError::Rpc {
            code: 0,
            message: format!("empty result from {method}"),
        })
    }
}

#[async_trait]
impl Chain for RpcClient {
    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self.request("eth_chainId", json!([])).await?;
        Ok(id.as_u64())
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.request("eth_accounts", json!([])).await
    }

    async fn gas_price(&self) -> Result<U256> {
        self.request("eth_gasPrice", json!([])).await
    }

    async fn transaction_count(&self, address: Address) -> Result<U256> {
        self.request("eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256> {
        self.request("eth_estimateGas", json!([tx])).await
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        self.request("eth_call", json!([tx, "latest"])).await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        self.request("eth_sendRawTransaction", json!([raw])).await
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<H256> {
        self.request("eth_sendTransaction", json!([tx])).await
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        self.request_optional("eth_getTransactionReceipt", json!([hash]))
            .await
    }
}

// ─────────────────────────────────────────────────────────
// Error classification
// ─────────────────────────────────────────────────────────

/// Map a node error onto a revert when it carries one, otherwise keep it as
/// an opaque RPC fault.
pub fn classify_error(err: RpcError) -> OperatorError {
    match revert_reason(&err) {
        Some(reason) => OperatorError::TransactionReverted(reason),
        None => OperatorError::Rpc {
            code: err.code,
            message: err.message,
        },
    }
}

/// Extract the revert reason from a node error, if the error is a revert.
///
/// Geth-style nodes put the ABI encoded `Error(string)` payload in `data`;
/// ganache nests it one level deeper and also spells it out in `message`.
pub fn revert_reason(err: &RpcError) -> Option<String> {
    let payload = err.data.as_ref().and_then(|d| {
        d.as_str()
            .map(String::from)
            .or_else(|| d.get("data").and_then(|v| v.as_str()).map(String::from))
    });
    if let Some(reason) = payload.as_deref().and_then(decode_error_string) {
        return Some(reason);
    }

    let message = err.message.as_str();
    if !message.contains("revert") {
        return None;
    }
    for prefix in [
        "execution reverted: ",
        "VM Exception while processing transaction: revert ",
        "Error: VM Exception while processing transaction: reverted with reason string ",
    ] {
        if let Some(rest) = message.strip_prefix(prefix) {
            return Some(rest.trim_matches('\'').to_string());
        }
    }
    Some(message.to_string())
}

fn decode_error_string(hex_data: &str) -> Option<String> {
    let bytes = hex::decode(hex_data.trim_start_matches("0x")).ok()?;
    if bytes.len() < 4 || bytes[..4] != ERROR_STRING_SELECTOR {
        return None;
    }
    match ethers::abi::decode(&[ParamType::String], &bytes[4..]).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
