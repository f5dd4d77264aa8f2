//! Chain Client: nonce, fee and broadcast round-trips to a BSC/Ethereum node.

use core::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;
use zkbnb_signer::{CallContext, Interrupted};

/// Failure talking to the node.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl ChainError {
    /// Node rejections that clear up with a refreshed nonce, a higher gas
    /// price or simply waiting. Reverts and malformed payloads do not.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Interrupted(Interrupted::TimedOut(_)) => true,
            Self::Interrupted(Interrupted::Cancelled) => false,
            Self::Rpc { message, .. } => {
                let message = message.to_ascii_lowercase();
                ["nonce too low", "underpriced", "already known"]
                    .iter()
                    .any(|needle| message.contains(needle))
            }
            Self::Decode(_) => false,
        }
    }

    pub fn is_nonce_too_low(&self) -> bool {
        matches!(
            self,
            Self::Rpc { message, .. } if message.to_ascii_lowercase().contains("nonce too low")
        )
    }
}

/// `eth_estimateGas` call object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    pub data: Bytes,
}

/// Node capabilities the options builder and the contract need.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Nonce of `address` including transactions still in the pool.
    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError>;

    async fn suggest_gas_price(&self) -> Result<U256, ChainError>;

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainError>;

    /// Submit a signed EIP-2718 encoded transaction; returns the hash the node reports.
    async fn broadcast(&self, raw: Bytes) -> Result<B256, ChainError>;
}

#[async_trait]
impl<T: ChainClient + ?Sized> ChainClient for Arc<T> {
    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError> {
        (**self).pending_nonce(address).await
    }

    async fn suggest_gas_price(&self) -> Result<U256, ChainError> {
        (**self).suggest_gas_price().await
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainError> {
        (**self).estimate_gas(call).await
    }

    async fn broadcast(&self, raw: Bytes) -> Result<B256, ChainError> {
        (**self).broadcast(raw).await
    }
}

/// Run a chain call under the caller's deadline and cancellation token.
pub(crate) async fn with_context<F, T>(ctx: &CallContext, fut: F) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    ctx.run(fut).await?
}

// ---------------------------------------------------------------------------
// JSON-RPC over HTTP
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

impl<R> RpcResponse<R> {
    fn into_result(self, method: &str) -> Result<R, ChainError> {
        if let Some(err) = self.error {
            return Err(ChainError::Rpc { code: err.code, message: err.message });
        }
        self.result.ok_or_else(|| ChainError::Decode(format!("{method}: missing result")))
    }
}

/// [`ChainClient`] speaking JSON-RPC 2.0 to a node over HTTP.
#[derive(Debug)]
pub struct HttpChainClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpChainClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Reuse a configured `reqwest` client (proxies, TLS roots, pool limits).
    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into(), next_id: AtomicU64::new(1) }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<P, R>(&self, method: &str, params: P) -> Result<R, ChainError>
    where
        P: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(target: "rollup::chain", method, id, "json-rpc request");
        let body = RpcRequest { jsonrpc: "2.0", id, method, params };
        let payload =
            self.http.post(&self.url).json(&body).send().await?.error_for_status()?.bytes().await?;
        let response: RpcResponse<R> = serde_json::from_slice(&payload)
            .map_err(|e| ChainError::Decode(format!("{method}: {e}")))?;
        response.into_result(method)
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError> {
        let nonce: U64 = self.request("eth_getTransactionCount", (address, "pending")).await?;
        Ok(nonce.to::<u64>())
    }

    async fn suggest_gas_price(&self) -> Result<U256, ChainError> {
        let params: [(); 0] = [];
        self.request("eth_gasPrice", params).await
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainError> {
        let gas: U64 = self.request("eth_estimateGas", (call,)).await?;
        Ok(gas.to::<u64>())
    }

    async fn broadcast(&self, raw: Bytes) -> Result<B256, ChainError> {
        self.request("eth_sendRawTransaction", (raw,)).await
    }
}
