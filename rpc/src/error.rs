//! RPC error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("response has no `result` field: {0}")]
    MissingResult(String),

    #[error("could not decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("{method} failed after {attempts} attempts: {last}")]
    Exhausted {
        method: String,
        attempts: u32,
        last: Box<RpcError>,
    },

    #[error("price lookup failed: {0}")]
    Price(String),
}

impl RpcError {
    /// Whether another attempt at the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status(_) | Self::Node { .. } | Self::MissingResult(_)
        )
    }
}
