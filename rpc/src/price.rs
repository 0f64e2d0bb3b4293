//! Spot price lookup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use ember_types::UsdAmount;

use crate::RpcError;

const COINBASE_URL: &str = "https://api.coinbase.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A source of USD spot prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current price of one unit of `symbol` (e.g. `"ETH"`) in USD.
    async fn spot_price(&self, symbol: &str) -> Result<UsdAmount, RpcError>;
}

#[async_trait]
impl<T: PriceSource + ?Sized> PriceSource for Arc<T> {
    async fn spot_price(&self, symbol: &str) -> Result<UsdAmount, RpcError> {
        (**self).spot_price(symbol).await
    }
}

/// `GET /v2/prices/{SYMBOL}-USD/spot` on the Coinbase public API.
pub struct CoinbaseClient {
    http_client: reqwest::Client,
    base_url: String,
}

/// `{"data": {"base": "ETH", "currency": "USD", "amount": "4567.89"}}`
#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    amount: String,
}

impl CoinbaseClient {
    pub fn new() -> Self {
        Self::with_url(COINBASE_URL)
    }

    pub fn with_url(base_url: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn spot_url(&self, symbol: &str) -> String {
        format!(
            "{}/v2/prices/{}-USD/spot",
            self.base_url,
            symbol.to_ascii_uppercase()
        )
    }
}

impl Default for CoinbaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for CoinbaseClient {
    async fn spot_price(&self, symbol: &str) -> Result<UsdAmount, RpcError> {
        let url = self.spot_url(symbol);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| RpcError::Price(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(RpcError::Price(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Price(format!("reading body: {e}")))?;
        parse_spot(&body)
    }
}

fn parse_spot(body: &str) -> Result<UsdAmount, RpcError> {
    let spot: SpotResponse =
        serde_json::from_str(body).map_err(|e| RpcError::Price(format!("bad response: {e}")))?;
    UsdAmount::parse(&spot.data.amount).map_err(|e| RpcError::Price(e.to_string()))
}
