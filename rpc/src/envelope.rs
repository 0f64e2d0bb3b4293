//! JSON-RPC 2.0 request and response envelopes.

use serde::Serialize;
use serde_json::Value;

use crate::RpcError;

/// A single JSON-RPC call. Every request carries `id: 1`; calls are never
/// batched or pipelined.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Vec<Value>,
    pub id: u64,
}

impl<'a> Request<'a> {
    pub fn new(method: &'a str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        }
    }
}

/// Pull the `result` member out of a response body.
///
/// A non-2xx status, an `error` member, or a missing or null `result` are
/// all reported as retryable errors.
pub fn extract_result(status: u16, body: &str) -> Result<Value, RpcError> {
    if !(200..300).contains(&status) {
        return Err(RpcError::Status(status));
    }
    let mut value: Value = serde_json::from_str(body).map_err(|e| RpcError::Decode {
        what: "response envelope".into(),
        reason: e.to_string(),
    })?;
    if let Some(error) = value.get("error") {
        return Err(RpcError::Node {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        });
    }
    match value.get_mut("result").map(Value::take) {
        Some(Value::Null) | None => Err(RpcError::MissingResult(truncate(body))),
        Some(result) => Ok(result),
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
