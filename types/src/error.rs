//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while constructing or parsing EMBER value types.
#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("invalid hex quantity: {0:?}")]
    InvalidQuantity(String),

    #[error("invalid hash: {0:?}")]
    InvalidHash(String),

    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(u64),

    #[error("uncle index {0} out of range (a block holds at most two uncles)")]
    UncleIndexOutOfRange(u32),
}
