//! Nullable ledger: an in-memory chain served through [`LedgerClient`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use ember_rpc::{LedgerClient, RpcError};
use ember_types::{BlockNumber, RpcBlock, RpcUncle};

/// A scripted ledger for testing.
///
/// Blocks and uncles are pushed by the test; every call is recorded so tests
/// can assert which keys were fetched and in which order.
pub struct NullLedger {
    head: AtomicU64,
    blocks: Mutex<BTreeMap<BlockNumber, RpcBlock>>,
    uncles: Mutex<HashMap<BlockNumber, Vec<RpcUncle>>>,
    calls: Mutex<Vec<String>>,
    fail_remaining: AtomicU32,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            head: AtomicU64::new(0),
            blocks: Mutex::new(BTreeMap::new()),
            uncles: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_remaining: AtomicU32::new(0),
        }
    }

    /// Add a block. The head becomes the highest block pushed so far.
    pub fn push_block(&self, block: RpcBlock) {
        self.head.fetch_max(block.number, Ordering::SeqCst);
        self.blocks.lock().unwrap().insert(block.number, block);
    }

    /// Attach uncles to `owner`, in index order.
    pub fn set_uncles(&self, owner: BlockNumber, uncles: Vec<RpcUncle>) {
        self.uncles.lock().unwrap().insert(owner, uncles);
    }

    pub fn set_head(&self, head: BlockNumber) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Fail the next `n` calls as if retries were exhausted.
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Every call made so far, e.g. `"block:100"` or `"uncle:100:1"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls of one kind (`"head"`, `"block"`, `"uncle_count"`, `"uncle"`).
    pub fn calls_of(&self, kind: &str) -> Vec<String> {
        let prefix = format!("{kind}:");
        self.calls()
            .into_iter()
            .filter(|c| c == kind || c.starts_with(&prefix))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record_call(&self, method: &str, call: String) -> Result<(), RpcError> {
        self.calls.lock().unwrap().push(call);
        let failing = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RpcError::Exhausted {
                method: method.to_string(),
                attempts: 10,
                last: Box::new(RpcError::Status(503)),
            });
        }
        Ok(())
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for NullLedger {
    async fn head_number(&self) -> Result<BlockNumber, RpcError> {
        self.record_call("eth_blockNumber", "head".into())?;
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn block_by_number(&self, number: BlockNumber) -> Result<RpcBlock, RpcError> {
        self.record_call("eth_getBlockByNumber", format!("block:{number}"))?;
        self.blocks
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| RpcError::MissingResult(format!("no block {number}")))
    }

    async fn uncle_count(&self, number: BlockNumber) -> Result<u32, RpcError> {
        self.record_call("eth_getUncleCountByBlockNumber", format!("uncle_count:{number}"))?;
        Ok(self
            .uncles
            .lock()
            .unwrap()
            .get(&number)
            .map_or(0, |u| u.len() as u32))
    }

    async fn uncle_by_number_and_index(
        &self,
        number: BlockNumber,
        index: u32,
    ) -> Result<RpcUncle, RpcError> {
        self.record_call(
            "eth_getUncleByBlockNumberAndIndex",
            format!("uncle:{number}:{index}"),
        )?;
        self.uncles
            .lock()
            .unwrap()
            .get(&number)
            .and_then(|u| u.get(index as usize))
            .cloned()
            .ok_or_else(|| RpcError::MissingResult(format!("no uncle {number}/{index}")))
    }
}
