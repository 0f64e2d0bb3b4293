//! Clients for the external services EMBER consumes.
//!
//! - [`LedgerClient`]: the four JSON-RPC calls the puller needs, implemented
//!   over HTTP by [`HttpLedgerClient`] with retry and exponential backoff.
//! - [`PriceSource`]: spot prices by asset symbol, implemented by
//!   [`CoinbaseClient`].

pub mod client;
pub mod envelope;
pub mod error;
pub mod price;
pub mod retry;

pub use client::{HttpLedgerClient, LedgerClient};
pub use error::RpcError;
pub use price::{CoinbaseClient, PriceSource};
pub use retry::RetryPolicy;
