//! Nullable price source: a settable spot price.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use ember_rpc::{PriceSource, RpcError};
use ember_types::UsdAmount;

/// A price source returning whatever price the test last set.
pub struct NullPriceSource {
    price: Mutex<Option<UsdAmount>>,
    calls: AtomicU32,
}

impl NullPriceSource {
    pub fn new(price: UsdAmount) -> Self {
        Self {
            price: Mutex::new(Some(price)),
            calls: AtomicU32::new(0),
        }
    }

    /// A source whose every lookup fails.
    pub fn failing() -> Self {
        Self {
            price: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set_price(&self, price: UsdAmount) {
        *self.price.lock().unwrap() = Some(price);
    }

    /// Make every subsequent lookup fail.
    pub fn fail(&self) {
        *self.price.lock().unwrap() = None;
    }

    /// Number of lookups so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for NullPriceSource {
    async fn spot_price(&self, symbol: &str) -> Result<UsdAmount, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (*self.price.lock().unwrap())
            .ok_or_else(|| RpcError::Price(format!("no price configured for {symbol}")))
    }
}
