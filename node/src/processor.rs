//! Aggregation engine.
//!
//! Consumes cached records in strict key order, keeps the running burned
//! total and emits one-shot reports when an hour or day ends or when the
//! cumulative burn crosses an ETH or USD step.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use ember_rpc::PriceSource;
use ember_store::{PendingReport, RecordStore, ReportStore, StoreError};
use ember_types::{
    BlockHeader, BlockNumber, Bucket, ChainRecord, Clock, Threshold, Timestamp, UsdAmount,
    WeiAmount,
};

use crate::reader::SequentialReader;
use crate::readiness::{ReadySignal, ReadyWaiter};
use crate::render::{ArtifactRenderer, SvgRenderer};
use crate::window::{aggregate, RetainedWindow};
use crate::{report, NodeConfig, NodeError, NodeMetrics, ShutdownToken};

/// The USD threshold is evaluated on every record whose key is a multiple of this.
pub const USD_CHECK_INTERVAL: BlockNumber = 10;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("first record {block} at {timestamp} is not before the start of the current day {day_start}")]
    StartedMidDay {
        block: BlockNumber,
        timestamp: Timestamp,
        day_start: Timestamp,
    },

    #[error("record {got} does not follow record {previous}")]
    NonContiguous {
        previous: BlockNumber,
        got: BlockNumber,
    },

    #[error("report store: {0}")]
    Store(#[from] StoreError),
}

/// Step sizes and price settings.
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub eth_step: WeiAmount,
    pub usd_step: UsdAmount,
    pub price_staleness_secs: u64,
    pub price_symbol: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::from(&NodeConfig::default())
    }
}

impl From<&NodeConfig> for ProcessorConfig {
    fn from(config: &NodeConfig) -> Self {
        Self {
            eth_step: config.eth_step_amount(),
            usd_step: config.usd_step_amount(),
            price_staleness_secs: config.price_staleness_secs,
            price_symbol: config.price_symbol.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PriceObservation {
    price: UsdAmount,
    fetched_at: Timestamp,
}

/// Smallest multiple of `step` strictly above `value`.
fn step_above(value: u128, step: u128) -> u128 {
    (value / step + 1) * step
}

pub struct Processor<R, P, C> {
    reports: Arc<R>,
    prices: P,
    clock: C,
    renderer: Box<dyn ArtifactRenderer>,
    config: ProcessorConfig,
    metrics: Arc<NodeMetrics>,

    window: RetainedWindow,
    last_key: Option<BlockNumber>,
    burned_before: WeiAmount,
    cumulative: WeiAmount,
    next_eth: WeiAmount,
    next_usd: Option<UsdAmount>,
    emitted: HashSet<String>,
    price: Option<PriceObservation>,
}

impl<R, P, C> Processor<R, P, C>
where
    R: ReportStore,
    P: PriceSource,
    C: Clock,
{
    /// A processor whose cumulative total starts at `burned_before`.
    ///
    /// The first ETH step is the configured step, or the first multiple of it
    /// above the seed when the seed already passed it.
    pub fn new(
        reports: Arc<R>,
        prices: P,
        clock: C,
        burned_before: WeiAmount,
        config: ProcessorConfig,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        let eth_step = config.eth_step.raw().max(1);
        let next_eth = WeiAmount::new(eth_step.max(step_above(burned_before.raw(), eth_step)));
        Self {
            reports,
            prices,
            clock,
            renderer: Box::new(SvgRenderer::new()),
            config,
            metrics,
            window: RetainedWindow::new(),
            last_key: None,
            burned_before,
            cumulative: burned_before,
            next_eth,
            next_usd: None,
            emitted: HashSet::new(),
            price: None,
        }
    }

    pub fn with_renderer(mut self, renderer: impl ArtifactRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn cumulative(&self) -> WeiAmount {
        self.cumulative
    }

    pub fn next_eth_threshold(&self) -> WeiAmount {
        self.next_eth
    }

    /// `None` until the first price has been observed. The first step is the
    /// one just above the seed's value at that price, so steps crossed before
    /// the first observation are still reported.
    pub fn next_usd_threshold(&self) -> Option<UsdAmount> {
        self.next_usd
    }

    pub fn last_key(&self) -> Option<BlockNumber> {
        self.last_key
    }

    pub fn window(&self) -> &RetainedWindow {
        &self.window
    }

    /// Consume the next record. Records must arrive in strictly increasing,
    /// gap-free key order.
    pub async fn process(&mut self, record: ChainRecord) -> Result<(), ProcessorError> {
        let number = record.number();
        match self.last_key {
            None => {
                let day_start = self.clock.now().day_start();
                if record.timestamp() >= day_start {
                    return Err(ProcessorError::StartedMidDay {
                        block: number,
                        timestamp: record.timestamp(),
                        day_start,
                    });
                }
            }
            Some(previous) if number != previous + 1 => {
                return Err(ProcessorError::NonContiguous {
                    previous,
                    got: number,
                });
            }
            Some(_) => {}
        }

        let burned = record.burned();
        tracing::debug!(block = number, timestamp = %record.timestamp(), burned = %burned, "processing record");
        self.last_key = Some(number);
        self.window.push(record);
        self.cumulative += burned;
        self.metrics.records_processed.inc();
        self.metrics.last_processed_block.set(number as i64);
        self.metrics
            .cumulative_burned_eth
            .set(i64::try_from(self.cumulative.whole_eth()).unwrap_or(i64::MAX));

        if number % USD_CHECK_INTERVAL == 0 {
            self.check_usd_threshold().await?;
        }
        self.check_time_boundaries().await?;
        self.check_eth_threshold().await?;
        Ok(())
    }

    // ── Dedup ───────────────────────────────────────────────────────────

    /// Whether a report for `label` still has to be written.
    pub fn needs_report(&mut self, label: &str) -> Result<bool, StoreError> {
        if self.emitted.contains(label) {
            return Ok(false);
        }
        if self.reports.is_published(label)? {
            tracing::info!(label, "report already published");
            self.emitted.insert(label.to_string());
            return Ok(false);
        }
        Ok(true)
    }

    fn write_report(&mut self, report: PendingReport) -> Result<(), StoreError> {
        self.reports.write_pending(&report)?;
        tracing::info!(label = %report.label, "report written to pending");
        self.metrics.reports_written.inc();
        self.emitted.insert(report.label);
        Ok(())
    }

    // ── Price ───────────────────────────────────────────────────────────

    /// The latest price, refreshed first if it is missing or stale. A failed
    /// refresh keeps the previous observation.
    async fn current_price(&mut self) -> Option<UsdAmount> {
        let now = self.clock.now();
        let fresh = self
            .price
            .is_some_and(|obs| !obs.fetched_at.has_expired(self.config.price_staleness_secs, now));
        if !fresh {
            match self.prices.spot_price(&self.config.price_symbol).await {
                Ok(price) => {
                    tracing::debug!(price = %price, "price refreshed");
                    self.price = Some(PriceObservation {
                        price,
                        fetched_at: now,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "price refresh failed, keeping previous price");
                    self.metrics.price_failures.inc();
                }
            }
        }
        self.price.map(|obs| obs.price)
    }

    // ── Boundaries ──────────────────────────────────────────────────────

    async fn check_usd_threshold(&mut self) -> Result<(), ProcessorError> {
        let Some(price) = self.current_price().await else {
            return Ok(());
        };
        let value = self.cumulative.value_in_usd(price);
        let step = self.config.usd_step.raw().max(1);
        let seed_value = self.burned_before.value_in_usd(price);
        let next = *self
            .next_usd
            .get_or_insert_with(|| UsdAmount::new(step_above(seed_value.raw(), step)));
        if value < next {
            return Ok(());
        }

        let threshold = Threshold::Usd(next);
        let label = threshold.label();
        tracing::info!(value = %value.format_compact(), "{}", report::threshold_title(&threshold));
        if self.needs_report(&label)? {
            let text = report::usd_threshold_report(next, self.cumulative, price);
            self.write_report(PendingReport::text_only(label, text))?;
        }
        self.next_usd = Some(UsdAmount::new(next.raw() + step));
        Ok(())
    }

    async fn check_time_boundaries(&mut self) -> Result<(), ProcessorError> {
        let (Some(previous), Some(current)) = (self.window.previous(), self.window.last()) else {
            return Ok(());
        };
        let (prev_hour, cur_hour) = (previous.hour_bucket(), current.hour_bucket());
        let (prev_day, cur_day) = (previous.day_bucket(), current.day_bucket());

        if cur_hour != prev_hour {
            self.emit_bucket(prev_hour).await?;
        }
        if cur_day != prev_day {
            self.emit_bucket(prev_day).await?;
        }
        self.window.prune_before(cur_day.start());
        Ok(())
    }

    async fn emit_bucket(&mut self, bucket: Bucket) -> Result<(), ProcessorError> {
        let label = bucket.label();
        if !self.needs_report(&label)? {
            return Ok(());
        }
        let Some(snapshot) = aggregate(&self.window, bucket, self.cumulative) else {
            return Ok(());
        };
        tracing::info!(
            bucket = %bucket,
            blocks = snapshot.block_count(),
            burned = %snapshot.burned,
            "bucket closed"
        );
        let price = self.current_price().await;
        let text = report::bucket_report(&snapshot, price);
        let artifact = self.renderer.render(&snapshot, price);
        self.write_report(PendingReport::text_only(label, text).with_artifact(artifact))?;
        Ok(())
    }

    async fn check_eth_threshold(&mut self) -> Result<(), ProcessorError> {
        if self.cumulative < self.next_eth {
            return Ok(());
        }
        let next = self.next_eth;
        let threshold = Threshold::Eth(next);
        let label = threshold.label();
        tracing::info!(cumulative = %self.cumulative, "{}", report::threshold_title(&threshold));
        if self.needs_report(&label)? {
            let price = self.current_price().await;
            let text = report::eth_threshold_report(next, price);
            self.write_report(PendingReport::text_only(label, text))?;
        }
        self.next_eth = next + WeiAmount::new(self.config.eth_step.raw().max(1));
        Ok(())
    }

    // ── Loop ────────────────────────────────────────────────────────────

    /// Feed records from `reader` until shutdown.
    ///
    /// A miss sleeps `poll` and asks again. The first miss after the puller
    /// reports *synced* (or any miss, when no puller runs in this process)
    /// raises `caught_up`. Any processing error is fatal and returned.
    pub async fn run<S: RecordStore>(
        mut self,
        mut reader: SequentialReader<S>,
        poll: Duration,
        synced: Option<ReadyWaiter>,
        caught_up: ReadySignal,
        mut shutdown: ShutdownToken,
    ) -> Result<(), NodeError> {
        tracing::info!(
            first = reader.next_key(),
            cumulative = %self.cumulative,
            next_eth = %self.next_eth.format_eth(0),
            "processor starting"
        );
        while !shutdown.is_shutdown() {
            match reader.poll_next()? {
                Some(record) => {
                    self.process(record).await?;
                    tokio::task::yield_now().await;
                }
                None => {
                    let puller_synced = synced.as_ref().map_or(true, ReadyWaiter::is_ready);
                    if puller_synced && caught_up.set() {
                        tracing::info!(next = reader.next_key(), "processor caught up with ingestion");
                    }
                    tracing::debug!(next = reader.next_key(), "record not yet available");
                    if shutdown.sleep(poll).await {
                        break;
                    }
                }
            }
        }
        tracing::info!(last = ?self.last_key, "processor stopped");
        Ok(())
    }
}
