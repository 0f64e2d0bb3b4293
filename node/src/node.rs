//! The EMBER node: wires the puller, processor and publisher together.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use ember_rpc::{CoinbaseClient, HttpLedgerClient};
use ember_store_fs::{DataLayout, FsRecordStore, FsReportStore};
use ember_types::{Checkpoint, SystemClock};
use ember_utils::format_duration;

use crate::processor::{Processor, ProcessorConfig};
use crate::publisher::{LogSink, Publisher};
use crate::puller::{Puller, PullerConfig};
use crate::reader::SequentialReader;
use crate::readiness::{ReadySignal, ReadyWaiter};
use crate::{NodeConfig, NodeError, NodeMetrics, ShutdownController};

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Which loops a node runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Pull,
    Process,
    Publish,
    /// All three loops in one process.
    Run,
}

impl Mode {
    pub fn runs_puller(self) -> bool {
        matches!(self, Mode::Pull | Mode::Run)
    }

    pub fn runs_processor(self) -> bool {
        matches!(self, Mode::Process | Mode::Run)
    }

    pub fn runs_publisher(self) -> bool {
        matches!(self, Mode::Publish | Mode::Run)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Pull => "pull",
            Mode::Process => "process",
            Mode::Publish => "publish",
            Mode::Run => "run",
        };
        f.write_str(name)
    }
}

pub struct EmberNode {
    config: NodeConfig,
    mode: Mode,
    checkpoint: Checkpoint,
    records: Arc<FsRecordStore>,
    reports: Arc<FsReportStore>,
    metrics: Arc<NodeMetrics>,
    shutdown: Arc<ShutdownController>,
}

impl EmberNode {
    /// Validate `config` and open the stores under its data directory.
    pub fn new(config: NodeConfig, mode: Mode) -> Result<Self, NodeError> {
        config.validate()?;
        let checkpoint = config.checkpoint()?;
        let layout = DataLayout::new(&config.data_dir);
        let records = Arc::new(FsRecordStore::open(layout.clone())?);
        let reports = Arc::new(FsReportStore::open(layout)?);
        Ok(Self {
            config,
            mode,
            checkpoint,
            records,
            reports,
            metrics: Arc::new(NodeMetrics::new()),
            shutdown: Arc::new(ShutdownController::new()),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    pub fn metrics(&self) -> Arc<NodeMetrics> {
        self.metrics.clone()
    }

    /// Handle for stopping the node from outside `run`.
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        self.shutdown.clone()
    }

    /// Run the loops for this node's mode until a signal arrives or the
    /// processor fails.
    ///
    /// A processor failure stops every other loop and is returned.
    pub async fn run(&self) -> Result<(), NodeError> {
        let started = Instant::now();
        tracing::info!(
            mode = %self.mode,
            data_dir = %self.config.data_dir.display(),
            first_block = self.checkpoint.first_block,
            burned_before = %self.checkpoint.burned_before,
            "EMBER node starting"
        );

        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        let synced = if self.mode.runs_puller() {
            let (puller, synced) = self.build_puller();
            handles.push(tokio::spawn(puller.run(self.shutdown.token())));
            Some(synced)
        } else {
            None
        };

        let caught_up = ReadySignal::new();
        let caught_up_waiter = caught_up.waiter();

        let processor_handle = if self.mode.runs_processor() {
            Some(self.spawn_processor(synced, caught_up))
        } else {
            // Nothing to wait for; whatever is pending is final.
            caught_up.set();
            None
        };

        if self.mode.runs_publisher() {
            let publisher = Publisher::new(
                self.reports.clone(),
                LogSink,
                self.config.dry_run,
                self.metrics.clone(),
            );
            handles.push(tokio::spawn(publisher.run(
                caught_up_waiter,
                Duration::from_secs(self.config.publisher_busy_secs),
                Duration::from_secs(self.config.publisher_idle_secs),
                self.shutdown.token(),
            )));
        }

        let mut token = self.shutdown.token();
        tokio::select! {
            biased;
            _ = token.cancelled() => {}
            _ = self.shutdown.wait_for_signal() => {}
        }
        self.shutdown.shutdown();

        let result = match processor_handle {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => Err(NodeError::Task(format!("processor task: {e}"))),
            },
            None => Ok(()),
        };

        let wait_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background task ended abnormally");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        tracing::info!(
            uptime = %format_duration(started.elapsed().as_secs()),
            "EMBER node stopped"
        );
        result
    }

    fn build_puller(&self) -> (Puller<HttpLedgerClient, FsRecordStore>, ReadyWaiter) {
        let (short_interval, long_interval) = self.config.puller_intervals();
        let puller = Puller::new(
            HttpLedgerClient::new(self.config.rpc_url.clone()),
            self.records.clone(),
            self.checkpoint.first_block,
            PullerConfig {
                use_cache: self.config.use_cache,
                short_interval,
                long_interval,
            },
            self.metrics.clone(),
        );
        let synced = puller.synced();
        (puller, synced)
    }

    fn spawn_processor(
        &self,
        synced: Option<ReadyWaiter>,
        caught_up: ReadySignal,
    ) -> JoinHandle<Result<(), NodeError>> {
        let processor = Processor::new(
            self.reports.clone(),
            CoinbaseClient::new(),
            SystemClock,
            self.checkpoint.burned_before,
            ProcessorConfig::from(&self.config),
            self.metrics.clone(),
        );
        let reader = SequentialReader::new(self.records.clone(), self.checkpoint.first_block);
        let poll = Duration::from_secs(self.config.processor_poll_secs);
        let token = self.shutdown.token();
        let controller = self.shutdown.clone();
        tokio::spawn(async move {
            let result = processor.run(reader, poll, synced, caught_up, token).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "processor failed, stopping node");
                controller.shutdown();
            }
            result
        })
    }
}
