//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the loops (clock, ledger, price feed,
//! record cache, report queue) is abstracted behind a trait. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod fixtures;
pub mod ledger;
pub mod price;
pub mod store;

pub use clock::NullClock;
pub use ledger::NullLedger;
pub use price::NullPriceSource;
pub use store::{NullRecordStore, NullReportStore};
