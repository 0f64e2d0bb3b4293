use thiserror::Error;

use crate::processor::ProcessorError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] ember_store::StoreError),

    #[error("RPC error: {0}")]
    Rpc(#[from] ember_rpc::RpcError),

    #[error("invalid ledger data: {0}")]
    Types(#[from] ember_types::TypesError),

    #[error("aggregation halted: {0}")]
    Processor(#[from] ProcessorError),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("task failed: {0}")]
    Task(String),
}
