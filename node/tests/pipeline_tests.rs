//! The three loops over the filesystem stores: pull into the cache, process
//! into pending reports, publish, then restart without duplicating anything.

use std::sync::Arc;

use ember_node::{
    LogSink, NodeMetrics, Processor, ProcessorConfig, PublishOutcome, Publisher, Puller,
    PullerConfig, SequentialReader, ShutdownController,
};
use ember_nullables::fixtures::{block, block_with_uncles, uncle};
use ember_nullables::{NullClock, NullLedger, NullPriceSource};
use ember_store::{RecordStore, ReportStore};
use ember_store_fs::{DataLayout, FsRecordStore, FsReportStore};
use ember_types::time::{SECS_PER_DAY, SECS_PER_HOUR};
use ember_types::{UsdAmount, WeiAmount};

/// 2021-11-12 00:00:00 UTC.
const DAY: u64 = 1_636_675_200;

const HOUR_LABEL: &str = "2021-11-12T05:00UTC";

fn ledger() -> NullLedger {
    let ledger = NullLedger::new();
    let five = DAY + 5 * SECS_PER_HOUR;
    let six = five + SECS_PER_HOUR;
    let burn = WeiAmount::from_eth(1);
    ledger.push_block(block(100, five + 3_000, burn));
    ledger.push_block(block(101, five + 3_300, burn));
    ledger.push_block(block_with_uncles(102, five + 3_590, burn));
    ledger.set_uncles(102, vec![uncle(102, 1, five + 3_580)]);
    for (n, offset) in [(103, 10), (104, 20), (105, 30), (106, 40)] {
        ledger.push_block(block(n, six + offset, burn));
    }
    ledger
}

async fn process_all(records: &Arc<FsRecordStore>, reports: &Arc<FsReportStore>) -> u64 {
    let mut processor = Processor::new(
        reports.clone(),
        NullPriceSource::new(UsdAmount::from_dollars(4_000)),
        NullClock::new(DAY + 2 * SECS_PER_DAY),
        WeiAmount::ZERO,
        ProcessorConfig::default(),
        Arc::new(NodeMetrics::new()),
    );
    let mut reader = SequentialReader::new(records.clone(), 100);
    let mut processed = 0;
    while let Some(record) = reader.poll_next().unwrap() {
        processor.process(record).await.unwrap();
        processed += 1;
    }
    processed
}

#[tokio::test]
async fn pull_process_publish_and_restart() {
    let dir = tempfile::tempdir().expect("temp dir");
    let layout = DataLayout::new(dir.path());
    let records = Arc::new(FsRecordStore::open(layout.clone()).unwrap());
    let reports = Arc::new(FsReportStore::open(layout.clone()).unwrap());
    let metrics = Arc::new(NodeMetrics::new());

    // Pull: everything below the head lands in the cache.
    let mut puller = Puller::new(
        ledger(),
        records.clone(),
        100,
        PullerConfig::default(),
        metrics.clone(),
    );
    let outcome = puller.run_cycle(&ShutdownController::new().token()).await.unwrap();
    assert!(outcome.synced);
    assert_eq!(puller.last_seen(), 105);
    assert!(records.get_record(106).unwrap().is_none());
    assert_eq!(records.get_record(102).unwrap().unwrap().uncle_count, 1);

    // Process: the closed hour becomes a pending report with a chart.
    assert_eq!(process_all(&records, &reports).await, 6);
    assert_eq!(reports.pending_labels().unwrap(), vec![HOUR_LABEL]);
    let pending = reports.read_pending(HOUR_LABEL).unwrap().unwrap();
    assert!(pending.text.contains("Burned: 3.00 ETH ($12.00K)"));
    assert!(pending.text.contains("Issued: 7.81 ETH"));
    assert!(pending.text.ends_with("Blocks 100-102 (3)"));

    // Publish: moved to published, text and chart together.
    let mut publisher = Publisher::new(reports.clone(), LogSink, false, metrics.clone());
    assert_eq!(
        publisher.publish_next().await.unwrap(),
        PublishOutcome::Published(HOUR_LABEL.into())
    );
    assert_eq!(publisher.publish_next().await.unwrap(), PublishOutcome::Idle);
    assert!(reports.is_published(HOUR_LABEL).unwrap());
    assert!(layout
        .published_dir()
        .join(format!("report_{HOUR_LABEL}.svg"))
        .exists());

    // Restart over the same directory: the cache is reused and the published
    // report is not queued again.
    let records = Arc::new(FsRecordStore::open(layout.clone()).unwrap());
    let reports = Arc::new(FsReportStore::open(layout).unwrap());
    assert_eq!(process_all(&records, &reports).await, 6);
    assert!(reports.pending_labels().unwrap().is_empty());
}
