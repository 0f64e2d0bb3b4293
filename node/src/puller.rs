//! Ingestion loop.
//!
//! Walks the ledger from the last cached key toward the head, writing each
//! block (with its uncle summary) to the record cache. The head itself is
//! left for the next cycle since it may still change.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ember_rpc::LedgerClient;
use ember_store::{OnConflict, RecordStore};
use ember_types::{BlockHeader, BlockNumber, ChainRecord, Timestamp, UncleRecord};
use ember_utils::format_duration;

use crate::readiness::{ReadySignal, ReadyWaiter};
use crate::{NodeError, NodeMetrics, ShutdownToken};

/// A progress line is logged every this many keys.
const PROGRESS_EVERY: BlockNumber = 100;

#[derive(Clone, Debug)]
pub struct PullerConfig {
    /// Reuse cached records instead of re-fetching them.
    pub use_cache: bool,
    /// Sleep during minutes 59, 00 and 01 of each hour.
    pub short_interval: Duration,
    /// Sleep for the rest of the hour, and after a failed cycle.
    pub long_interval: Duration,
}

impl Default for PullerConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            short_interval: Duration::from_secs(1),
            long_interval: Duration::from_secs(10),
        }
    }
}

/// Sleep between cycles: short around the top of the hour, when hourly
/// reports are waiting on fresh blocks.
pub fn poll_interval(now: Timestamp, config: &PullerConfig) -> Duration {
    match now.minute_of_hour() {
        59 | 0 | 1 => config.short_interval,
        _ => config.long_interval,
    }
}

/// Result of one ingestion cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleOutcome {
    pub head: BlockNumber,
    /// Keys written (or confirmed cached) this cycle.
    pub advanced: u64,
    /// Everything below the head is cached.
    pub synced: bool,
}

pub struct Puller<L, S> {
    ledger: L,
    store: Arc<S>,
    config: PullerConfig,
    metrics: Arc<NodeMetrics>,
    last_seen: BlockNumber,
    synced: ReadySignal,
}

impl<L, S> Puller<L, S>
where
    L: LedgerClient,
    S: RecordStore,
{
    /// A puller whose first cycle starts at `first_block`.
    pub fn new(
        ledger: L,
        store: Arc<S>,
        first_block: BlockNumber,
        config: PullerConfig,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            ledger,
            store,
            config,
            metrics,
            last_seen: first_block.saturating_sub(1),
            synced: ReadySignal::new(),
        }
    }

    /// Highest key written so far (or `first_block - 1` before any write).
    pub fn last_seen(&self) -> BlockNumber {
        self.last_seen
    }

    /// Raised once a cycle finishes with everything below the head cached.
    pub fn synced(&self) -> ReadyWaiter {
        self.synced.waiter()
    }

    fn on_conflict(&self) -> OnConflict {
        if self.config.use_cache {
            OnConflict::Warn
        } else {
            OnConflict::Routine
        }
    }

    /// One pass over `[last_seen + 1, head)`.
    ///
    /// `last_seen` advances after every key, so an error or shutdown midway
    /// resumes exactly where it stopped.
    pub async fn run_cycle(&mut self, shutdown: &ShutdownToken) -> Result<CycleOutcome, NodeError> {
        let head = self.ledger.head_number().await?;
        self.metrics.head_block.set(head as i64);

        let mut advanced = 0;
        while self.last_seen + 1 < head {
            if shutdown.is_shutdown() {
                tracing::info!(last_seen = self.last_seen, "shutdown requested, leaving cycle");
                break;
            }
            let key = self.last_seen + 1;
            let record = self.pull_one(key).await?;
            self.last_seen = key;
            advanced += 1;
            self.metrics.last_cached_block.set(key as i64);
            if key % PROGRESS_EVERY == 0 {
                tracing::info!(
                    block = key,
                    time = %record.timestamp(),
                    behind = head - key,
                    lag = %format_duration(
                        Timestamp::now()
                            .as_secs()
                            .saturating_sub(record.timestamp().as_secs())
                    ),
                    "ingestion progress"
                );
            }
        }

        let synced = self.last_seen + 1 >= head;
        if synced && self.synced.set() {
            tracing::info!(head, "puller synced with ledger head");
        }
        Ok(CycleOutcome {
            head,
            advanced,
            synced,
        })
    }

    /// The record for `key`: from the cache when allowed, otherwise fetched,
    /// completed with its uncles and written.
    async fn pull_one(&self, key: BlockNumber) -> Result<ChainRecord, NodeError> {
        if self.config.use_cache {
            if let Some(record) = self.store.get_record(key)? {
                tracing::trace!(block = key, "record already cached");
                self.metrics.records_reused.inc();
                return Ok(record);
            }
        }

        let block = self.ledger.block_by_number(key).await?;
        let uncles = if block.has_uncles() {
            self.resolve_uncles(key).await?
        } else {
            Vec::new()
        };
        let record = ChainRecord::new(block, &uncles);
        self.store.put_record(&record, self.on_conflict())?;
        self.metrics.records_cached.inc();
        Ok(record)
    }

    /// Fetch and cache the uncles of `owner`, highest index first, so index 0
    /// lands last and marks the set complete.
    async fn resolve_uncles(&self, owner: BlockNumber) -> Result<Vec<UncleRecord>, NodeError> {
        let cached = if self.config.use_cache {
            self.store.cached_uncle_count(owner)?
        } else {
            0
        };
        let count = if cached > 0 {
            cached
        } else {
            self.ledger.uncle_count(owner).await?
        };
        tracing::debug!(block = owner, count, cached, "resolving uncles");

        let mut uncles = Vec::with_capacity(count as usize);
        for index in (0..count).rev() {
            let cached_uncle = if self.config.use_cache {
                self.store.get_uncle(owner, index)?
            } else {
                None
            };
            let uncle = match cached_uncle {
                Some(uncle) => uncle,
                None => {
                    let raw = self.ledger.uncle_by_number_and_index(owner, index).await?;
                    let uncle = UncleRecord::new(raw, owner, index)?;
                    self.store.put_uncle(&uncle, self.on_conflict())?;
                    self.metrics.uncles_cached.inc();
                    uncle
                }
            };
            uncles.push(uncle);
        }
        uncles.reverse();
        Ok(uncles)
    }

    /// Run cycles until shutdown.
    ///
    /// A failed cycle (e.g. RPC retries exhausted) is logged and retried
    /// after the long interval from the last written key; it never stops the
    /// loop.
    pub async fn run(mut self, mut shutdown: ShutdownToken) {
        tracing::info!(
            first = self.last_seen + 1,
            use_cache = self.config.use_cache,
            "puller starting"
        );
        while !shutdown.is_shutdown() {
            let started = Instant::now();
            let interval = match self.run_cycle(&shutdown).await {
                Ok(outcome) => {
                    tracing::debug!(
                        head = outcome.head,
                        advanced = outcome.advanced,
                        synced = outcome.synced,
                        "ingestion cycle complete"
                    );
                    poll_interval(Timestamp::now(), &self.config)
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        last_seen = self.last_seen,
                        "ingestion cycle abandoned"
                    );
                    self.metrics.ingestion_failures.inc();
                    self.config.long_interval
                }
            };
            self.metrics
                .ingestion_cycle_secs
                .observe(started.elapsed().as_secs_f64());
            if shutdown.sleep(interval).await {
                break;
            }
        }
        tracing::info!(last_seen = self.last_seen, "puller stopped");
    }
}
