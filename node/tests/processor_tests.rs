//! Processor scenarios: bucket boundaries, ETH and USD thresholds, report
//! deduplication across restarts, and the fatal ordering errors.

use std::sync::Arc;
use std::time::Duration;

use ember_node::{
    NodeError, NodeMetrics, Processor, ProcessorConfig, ProcessorError, ReadySignal,
    SequentialReader, ShutdownController,
};
use ember_nullables::fixtures::record;
use ember_nullables::{NullClock, NullPriceSource, NullRecordStore, NullReportStore};
use ember_store::{OnConflict, RecordStore, ReportStore};
use ember_types::time::{SECS_PER_DAY, SECS_PER_HOUR};
use ember_types::{UsdAmount, WeiAmount};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 2021-11-12 00:00:00 UTC.
const DAY: u64 = 1_636_675_200;

type TestProcessor = Processor<NullReportStore, Arc<NullPriceSource>, Arc<NullClock>>;

struct Harness {
    reports: Arc<NullReportStore>,
    prices: Arc<NullPriceSource>,
    clock: Arc<NullClock>,
    metrics: Arc<NodeMetrics>,
    processor: TestProcessor,
}

fn harness(burned_before: WeiAmount, config: ProcessorConfig) -> Harness {
    harness_with(Arc::new(NullReportStore::new()), burned_before, config)
}

fn harness_with(
    reports: Arc<NullReportStore>,
    burned_before: WeiAmount,
    config: ProcessorConfig,
) -> Harness {
    let prices = Arc::new(NullPriceSource::new(UsdAmount::from_dollars(4_000)));
    // Two days after the records, so none of them is in the current day.
    let clock = Arc::new(NullClock::new(DAY + 2 * SECS_PER_DAY));
    let metrics = Arc::new(NodeMetrics::new());
    let processor = Processor::new(
        reports.clone(),
        prices.clone(),
        clock.clone(),
        burned_before,
        config,
        metrics.clone(),
    );
    Harness {
        reports,
        prices,
        clock,
        metrics,
        processor,
    }
}

fn eth(whole: u64) -> WeiAmount {
    WeiAmount::from_eth(whole)
}

fn half_eth() -> WeiAmount {
    WeiAmount::new(500_000_000_000_000_000)
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hour_boundary_writes_one_report() {
    let mut h = harness(WeiAmount::ZERO, ProcessorConfig::default());
    let five = DAY + 5 * SECS_PER_HOUR;

    h.processor.process(record(100, five + 100, eth(1))).await.unwrap();
    h.processor.process(record(101, five + 200, eth(2))).await.unwrap();
    assert!(h.reports.pending_writes().is_empty());

    h.processor.process(record(102, five + SECS_PER_HOUR + 10, eth(1))).await.unwrap();
    h.processor.process(record(103, five + SECS_PER_HOUR + 20, eth(1))).await.unwrap();

    assert_eq!(h.reports.pending_writes(), vec!["2021-11-12T05:00UTC"]);
    let report = h
        .reports
        .read_pending("2021-11-12T05:00UTC")
        .unwrap()
        .expect("hour report pending");
    assert!(report.text.starts_with("Hourly Report: 2021-11-12 05:00-06:00 UTC"));
    assert!(report.text.contains("Burned: 3.00 ETH ($12.00K)"));
    assert!(report.text.ends_with("Blocks 100-101 (2)"));
    let artifact = report.artifact.expect("hour report carries a chart");
    assert_eq!(artifact.extension, "svg");
}

#[tokio::test]
async fn day_boundary_writes_hour_then_day() {
    let mut h = harness(WeiAmount::ZERO, ProcessorConfig::default());
    let last_second = DAY + SECS_PER_DAY - 1;

    h.processor.process(record(100, last_second - 30, eth(1))).await.unwrap();
    h.processor.process(record(101, last_second, eth(1))).await.unwrap();
    h.processor.process(record(102, last_second + 13, eth(1))).await.unwrap();

    assert_eq!(
        h.reports.pending_writes(),
        vec!["2021-11-12T23:00UTC", "2021-11-12"]
    );
    let daily = h.reports.read_pending("2021-11-12").unwrap().unwrap();
    assert!(daily.text.starts_with("Daily Report:"));
    // Only the new day's record survives pruning.
    assert_eq!(h.processor.window().len(), 1);
}

#[tokio::test]
async fn published_bucket_is_not_rewritten() {
    let reports = Arc::new(NullReportStore::new());
    reports.insert_published("2021-11-12T05:00UTC");
    let mut h = harness_with(reports, WeiAmount::ZERO, ProcessorConfig::default());
    let five = DAY + 5 * SECS_PER_HOUR;

    h.processor.process(record(100, five + 100, eth(1))).await.unwrap();
    h.processor.process(record(101, five + SECS_PER_HOUR, eth(1))).await.unwrap();

    assert!(h.reports.pending_writes().is_empty());
    assert!(!h.processor.needs_report("2021-11-12T05:00UTC").unwrap());
    assert!(h.processor.needs_report("2021-11-12T06:00UTC").unwrap());
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn eth_threshold_is_emitted_once() {
    let mut h = harness(eth(9_999), ProcessorConfig::default());
    assert_eq!(h.processor.next_eth_threshold(), eth(10_000));
    let ts = DAY + 3 * SECS_PER_HOUR;

    h.processor.process(record(101, ts, half_eth())).await.unwrap();
    assert!(h.reports.pending_writes().is_empty());
    h.processor.process(record(102, ts + 12, half_eth())).await.unwrap();
    assert_eq!(h.reports.pending_writes(), vec!["10000"]);
    assert_eq!(h.processor.next_eth_threshold(), eth(20_000));

    // More records at the same total change nothing.
    h.processor.process(record(103, ts + 24, WeiAmount::ZERO)).await.unwrap();
    assert_eq!(h.reports.pending_writes(), vec!["10000"]);

    // Replaying the last record is rejected without side effects.
    let err = h
        .processor
        .process(record(103, ts + 24, WeiAmount::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProcessorError::NonContiguous {
            previous: 103,
            got: 103
        }
    ));
    assert_eq!(h.reports.pending_writes(), vec!["10000"]);
    assert_eq!(h.processor.cumulative(), eth(10_000));

    let report = h.reports.read_pending("10000").unwrap().unwrap();
    assert_eq!(
        report.text,
        "10,000 ETH burned since London\nWorth $40.00M at $4,000.00 per ETH"
    );
}

#[tokio::test]
async fn four_large_burns_cross_ten_thousand_once() {
    let mut h = harness(WeiAmount::ZERO, ProcessorConfig::default());
    let ts = DAY + 9 * SECS_PER_HOUR;
    for n in 100..=103 {
        h.processor.process(record(n, ts + 12 * (n - 100), eth(2_500))).await.unwrap();
    }
    assert_eq!(h.processor.cumulative(), eth(10_000));
    assert_eq!(h.reports.pending_writes(), vec!["10000"]);

    h.processor.process(record(104, ts + 48, WeiAmount::ZERO)).await.unwrap();
    assert_eq!(h.reports.pending_writes(), vec!["10000"]);
}

#[tokio::test]
async fn eth_threshold_starts_above_seed() {
    let h = harness(eth(25_000), ProcessorConfig::default());
    assert_eq!(h.processor.next_eth_threshold(), eth(30_000));

    let h = harness(eth(30_000), ProcessorConfig::default());
    assert_eq!(h.processor.next_eth_threshold(), eth(40_000));
}

fn usd_config() -> ProcessorConfig {
    ProcessorConfig {
        eth_step: eth(1_000_000),
        usd_step: UsdAmount::from_dollars(1_000_000_000),
        ..ProcessorConfig::default()
    }
}

async fn feed_usd_scenario(processor: &mut TestProcessor) {
    let ts = DAY + 7 * SECS_PER_HOUR;
    processor.process(record(100, ts, WeiAmount::ZERO)).await.unwrap();
    processor.process(record(101, ts + 12, eth(100_000))).await.unwrap();
    for n in 102..=120 {
        processor
            .process(record(n, ts + 12 * (n - 100), WeiAmount::ZERO))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn usd_threshold_is_emitted_once_and_survives_restart() {
    let mut h = harness(eth(1_400_000), usd_config());
    feed_usd_scenario(&mut h.processor).await;

    assert_eq!(h.reports.pending_writes(), vec!["6000000000USD"]);
    assert_eq!(
        h.processor.next_usd_threshold(),
        Some(UsdAmount::from_dollars(7_000_000_000))
    );
    let report = h.reports.read_pending("6000000000USD").unwrap().unwrap();
    assert!(report.text.starts_with("$6.00B worth of ETH burned since London"));
    assert!(report.text.contains("1,500,000.00 ETH at $4,000.00 per ETH"));

    // A fresh processor over a queue where the report was already published.
    h.reports.publish("6000000000USD").unwrap();
    let mut restarted = harness_with(h.reports.clone(), eth(1_400_000), usd_config());
    feed_usd_scenario(&mut restarted.processor).await;
    assert_eq!(h.reports.pending_writes(), vec!["6000000000USD"]);
}

#[tokio::test]
async fn usd_step_crossed_before_first_check_is_reported() {
    let mut h = harness(eth(1_400_000), usd_config());
    let ts = DAY + 7 * SECS_PER_HOUR;
    // Starts off the check interval; $6B is crossed at key 105, before the
    // first price lookup at key 110.
    for n in 101..=130 {
        let burned = if n == 105 { eth(100_000) } else { WeiAmount::ZERO };
        h.processor
            .process(record(n, ts + 12 * (n - 100), burned))
            .await
            .unwrap();
    }

    assert_eq!(h.reports.pending_writes(), vec!["6000000000USD"]);
    assert_eq!(
        h.processor.next_usd_threshold(),
        Some(UsdAmount::from_dollars(7_000_000_000))
    );
}

#[tokio::test]
async fn usd_threshold_only_checked_on_interval_keys() {
    let mut h = harness(eth(1_400_000), usd_config());
    let ts = DAY + 7 * SECS_PER_HOUR;
    // Key 101 crosses $6B but is not a multiple of ten.
    h.processor.process(record(101, ts, eth(100_000))).await.unwrap();
    assert!(h.processor.next_usd_threshold().is_none());
    assert_eq!(h.prices.calls(), 0);
    assert!(h.reports.pending_writes().is_empty());
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_record_in_current_day_is_fatal() {
    let reports = Arc::new(NullReportStore::new());
    let clock = Arc::new(NullClock::new(DAY + 5 * SECS_PER_HOUR));
    let mut processor = Processor::new(
        reports.clone(),
        Arc::new(NullPriceSource::new(UsdAmount::from_dollars(4_000))),
        clock,
        WeiAmount::ZERO,
        ProcessorConfig::default(),
        Arc::new(NodeMetrics::new()),
    );

    let err = processor
        .process(record(100, DAY + SECS_PER_HOUR, eth(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessorError::StartedMidDay { block: 100, .. }));
    assert!(processor.last_key().is_none());
    assert!(reports.pending_writes().is_empty());
}

#[tokio::test]
async fn gap_is_fatal() {
    let mut h = harness(WeiAmount::ZERO, ProcessorConfig::default());
    h.processor.process(record(100, DAY, eth(1))).await.unwrap();
    let err = h.processor.process(record(102, DAY + 24, eth(1))).await.unwrap_err();
    assert!(matches!(
        err,
        ProcessorError::NonContiguous {
            previous: 100,
            got: 102
        }
    ));
    assert_eq!(h.processor.cumulative(), eth(1));
}

#[tokio::test]
async fn price_failure_is_not_fatal() {
    let mut h = harness(WeiAmount::ZERO, ProcessorConfig::default());
    h.prices.fail();
    let five = DAY + 5 * SECS_PER_HOUR;

    h.processor.process(record(100, five, eth(1))).await.unwrap();
    h.processor.process(record(101, five + SECS_PER_HOUR, eth(1))).await.unwrap();

    assert_eq!(h.reports.pending_writes(), vec!["2021-11-12T05:00UTC"]);
    let report = h.reports.read_pending("2021-11-12T05:00UTC").unwrap().unwrap();
    assert!(report.text.contains("Burned: 1.00 ETH\n"));
    assert!(h.metrics.price_failures.get() >= 1);
    assert!(h.processor.next_usd_threshold().is_none());
}

#[tokio::test]
async fn stale_price_is_refreshed_and_kept_on_failure() {
    let mut h = harness(WeiAmount::ZERO, ProcessorConfig::default());
    let five = DAY + 5 * SECS_PER_HOUR;

    // Key 100 is a USD check: first lookup at $4,000.
    h.processor.process(record(100, five + 100, eth(1))).await.unwrap();
    assert_eq!(h.prices.calls(), 1);

    // Still fresh: the new price is not fetched for the 05:00 report.
    h.prices.set_price(UsdAmount::from_dollars(5_000));
    h.clock.advance(200);
    h.processor.process(record(101, five + SECS_PER_HOUR + 10, eth(1))).await.unwrap();
    assert_eq!(h.prices.calls(), 1);
    let report = h.reports.read_pending("2021-11-12T05:00UTC").unwrap().unwrap();
    assert!(report.text.contains("Burned: 1.00 ETH ($4.00K)"));

    // Expired, and the refresh fails: the last price is reused.
    h.clock.advance(101);
    h.prices.fail();
    h.processor.process(record(102, five + 2 * SECS_PER_HOUR + 10, eth(1))).await.unwrap();
    assert_eq!(h.prices.calls(), 2);
    let report = h.reports.read_pending("2021-11-12T06:00UTC").unwrap().unwrap();
    assert!(report.text.contains("Burned: 1.00 ETH ($4.00K)"));
    assert_eq!(h.metrics.price_failures.get(), 1);
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

fn cached(store: &NullRecordStore, keys: std::ops::RangeInclusive<u64>, first_ts: u64) {
    for key in keys {
        let ts = first_ts + 12 * (key - 100);
        store.put_record(&record(key, ts, eth(1)), OnConflict::Warn).unwrap();
    }
}

#[tokio::test]
async fn run_consumes_cache_and_signals_caught_up() {
    let store = Arc::new(NullRecordStore::new());
    cached(&store, 100..=104, DAY + 5 * SECS_PER_HOUR);
    let h = harness(WeiAmount::ZERO, ProcessorConfig::default());
    let metrics = h.metrics.clone();

    let controller = ShutdownController::new();
    let caught_up = ReadySignal::new();
    let mut waiter = caught_up.waiter();
    let reader = SequentialReader::new(store, 100);
    let handle = tokio::spawn(h.processor.run(
        reader,
        Duration::from_millis(10),
        None,
        caught_up,
        controller.token(),
    ));

    assert!(waiter.wait().await);
    assert_eq!(metrics.records_processed.get(), 5);
    assert_eq!(metrics.last_processed_block.get(), 104);

    controller.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn run_waits_for_puller_before_caught_up() {
    let store = Arc::new(NullRecordStore::new());
    cached(&store, 100..=101, DAY + 5 * SECS_PER_HOUR);
    let h = harness(WeiAmount::ZERO, ProcessorConfig::default());

    let controller = ShutdownController::new();
    let synced = ReadySignal::new();
    let caught_up = ReadySignal::new();
    let waiter = caught_up.waiter();
    let reader = SequentialReader::new(store, 100);
    let handle = tokio::spawn(h.processor.run(
        reader,
        Duration::from_millis(5),
        Some(synced.waiter()),
        caught_up,
        controller.token(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_ready());

    synced.set();
    let mut waiter = waiter;
    assert!(waiter.wait().await);

    controller.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn run_returns_fatal_error() {
    let store = Arc::new(NullRecordStore::new());
    cached(&store, 100..=100, DAY);
    cached(&store, 102..=102, DAY);
    let h = harness(WeiAmount::ZERO, ProcessorConfig::default());

    // Key 101 is missing, so the reader stops at 100 and never sees 102.
    let controller = ShutdownController::new();
    let reader = SequentialReader::new(store.clone(), 100);
    let caught_up = ReadySignal::new();
    let mut waiter = caught_up.waiter();
    let handle = tokio::spawn(h.processor.run(
        reader,
        Duration::from_millis(5),
        None,
        caught_up,
        controller.token(),
    ));
    assert!(waiter.wait().await);
    controller.shutdown();
    handle.await.unwrap().unwrap();

    // A record stamped inside the current day cannot start processing.
    let late = Arc::new(NullRecordStore::new());
    cached(&late, 100..=100, DAY + 2 * SECS_PER_DAY + 60);
    let h = harness(WeiAmount::ZERO, ProcessorConfig::default());
    let controller = ShutdownController::new();
    let result = h
        .processor
        .run(
            SequentialReader::new(late, 100),
            Duration::from_millis(5),
            None,
            ReadySignal::new(),
            controller.token(),
        )
        .await;
    assert!(matches!(
        result,
        Err(NodeError::Processor(ProcessorError::StartedMidDay { .. }))
    ));
}
