//! Ledger JSON-RPC client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use ember_types::quantity::{format_quantity, parse_quantity};
use ember_types::{BlockNumber, RpcBlock, RpcUncle};

use crate::envelope::{extract_result, Request};
use crate::{RetryPolicy, RpcError};

/// Upper bound on a single HTTP exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The ledger calls the ingestion loop depends on.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// `eth_blockNumber`
    async fn head_number(&self) -> Result<BlockNumber, RpcError>;

    /// `eth_getBlockByNumber(n, false)`
    async fn block_by_number(&self, number: BlockNumber) -> Result<RpcBlock, RpcError>;

    /// `eth_getUncleCountByBlockNumber(n)`
    async fn uncle_count(&self, number: BlockNumber) -> Result<u32, RpcError>;

    /// `eth_getUncleByBlockNumberAndIndex(n, i)`
    async fn uncle_by_number_and_index(
        &self,
        number: BlockNumber,
        index: u32,
    ) -> Result<RpcUncle, RpcError>;
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn head_number(&self) -> Result<BlockNumber, RpcError> {
        (**self).head_number().await
    }

    async fn block_by_number(&self, number: BlockNumber) -> Result<RpcBlock, RpcError> {
        (**self).block_by_number(number).await
    }

    async fn uncle_count(&self, number: BlockNumber) -> Result<u32, RpcError> {
        (**self).uncle_count(number).await
    }

    async fn uncle_by_number_and_index(
        &self,
        number: BlockNumber,
        index: u32,
    ) -> Result<RpcUncle, RpcError> {
        (**self).uncle_by_number_and_index(number, index).await
    }
}

/// [`LedgerClient`] over HTTP JSON-RPC, retrying every call per its
/// [`RetryPolicy`].
pub struct HttpLedgerClient {
    http_client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl HttpLedgerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_retry(url, RetryPolicy::default())
    }

    pub fn with_retry(url: impl Into<String>, retry: RetryPolicy) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            retry,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call_once(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let request = Request::new(method, params.to_vec());
        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Transport(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    RpcError::Transport(format!("connection failed: {e}"))
                } else {
                    RpcError::Transport(e.to_string())
                }
            })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(format!("reading body: {e}")))?;
        extract_result(status, &body)
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.retry
            .run(method, || self.call_once(method, &params))
            .await
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let value = self.call(method, params).await?;
        decode(method, value)
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn head_number(&self) -> Result<BlockNumber, RpcError> {
        let value: String = self.call_typed("eth_blockNumber", vec![]).await?;
        parse_number("eth_blockNumber", &value)
    }

    async fn block_by_number(&self, number: BlockNumber) -> Result<RpcBlock, RpcError> {
        let value = self
            .call(
                "eth_getBlockByNumber",
                vec![json!(format_quantity(number as u128)), json!(false)],
            )
            .await?;
        if value.get("baseFeePerGas").is_none() {
            tracing::error!(block = number, "block result has no baseFeePerGas, assuming zero");
        }
        decode("eth_getBlockByNumber", value)
    }

    async fn uncle_count(&self, number: BlockNumber) -> Result<u32, RpcError> {
        let value: String = self
            .call_typed(
                "eth_getUncleCountByBlockNumber",
                vec![json!(format_quantity(number as u128))],
            )
            .await?;
        let count = parse_number("eth_getUncleCountByBlockNumber", &value)?;
        u32::try_from(count).map_err(|_| RpcError::Decode {
            what: "uncle count".into(),
            reason: format!("{count} out of range"),
        })
    }

    async fn uncle_by_number_and_index(
        &self,
        number: BlockNumber,
        index: u32,
    ) -> Result<RpcUncle, RpcError> {
        self.call_typed(
            "eth_getUncleByBlockNumberAndIndex",
            vec![
                json!(format_quantity(number as u128)),
                json!(format_quantity(index as u128)),
            ],
        )
        .await
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::Decode {
        what: method.to_string(),
        reason: e.to_string(),
    })
}

fn parse_number(method: &str, quantity: &str) -> Result<u64, RpcError> {
    let value = parse_quantity(quantity).map_err(|e| RpcError::Decode {
        what: method.to_string(),
        reason: e.to_string(),
    })?;
    u64::try_from(value).map_err(|_| RpcError::Decode {
        what: method.to_string(),
        reason: format!("{quantity} does not fit in u64"),
    })
}
