//! Publishing loop: drains pending reports one per cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use ember_store::{PendingReport, ReportStore, StoreError};

use crate::readiness::ReadyWaiter;
use crate::{NodeMetrics, ShutdownToken};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink rejected report {label}: {reason}")]
    Rejected { label: String, reason: String },

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Where published reports go.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: &PendingReport) -> Result<(), SinkError>;
}

#[async_trait]
impl<T: ReportSink + ?Sized> ReportSink for Arc<T> {
    async fn deliver(&self, report: &PendingReport) -> Result<(), SinkError> {
        (**self).deliver(report).await
    }
}

/// Writes reports to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn deliver(&self, report: &PendingReport) -> Result<(), SinkError> {
        tracing::info!(
            label = %report.label,
            artifact = report.artifact.as_ref().map(|a| a.extension.as_str()),
            "publishing report:\n{}",
            report.text
        );
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing pending.
    Idle,
    /// Delivered and moved to published.
    Published(String),
    /// Delivered in dry-run mode; left in pending.
    DryRun(String),
    /// The sink failed; the report stays pending for the next cycle.
    Failed(String),
}

pub struct Publisher<R, K> {
    reports: Arc<R>,
    sink: K,
    dry_run: bool,
    metrics: Arc<NodeMetrics>,
    /// Labels already shown in dry-run mode.
    shown: HashSet<String>,
}

impl<R, K> Publisher<R, K>
where
    R: ReportStore,
    K: ReportSink,
{
    pub fn new(reports: Arc<R>, sink: K, dry_run: bool, metrics: Arc<NodeMetrics>) -> Self {
        Self {
            reports,
            sink,
            dry_run,
            metrics,
            shown: HashSet::new(),
        }
    }

    /// Deliver the oldest pending report.
    ///
    /// The move to published happens only after the sink accepted the report,
    /// so a crash in between redelivers rather than loses it.
    pub async fn publish_next(&mut self) -> Result<PublishOutcome, StoreError> {
        let labels = self.reports.pending_labels()?;
        let Some(label) = labels
            .into_iter()
            .find(|label| !(self.dry_run && self.shown.contains(label)))
        else {
            return Ok(PublishOutcome::Idle);
        };
        let Some(report) = self.reports.read_pending(&label)? else {
            tracing::warn!(label = %label, "pending report vanished before it was read");
            return Ok(PublishOutcome::Idle);
        };

        if let Err(e) = self.sink.deliver(&report).await {
            tracing::warn!(label = %label, error = %e, "report delivery failed, will retry");
            self.metrics.publish_failures.inc();
            return Ok(PublishOutcome::Failed(label));
        }

        if self.dry_run {
            tracing::info!(label = %label, "dry run, report left pending");
            self.shown.insert(label.clone());
            return Ok(PublishOutcome::DryRun(label));
        }

        self.reports.publish(&label)?;
        self.metrics.reports_published.inc();
        tracing::debug!(label = %label, "report published");
        Ok(PublishOutcome::Published(label))
    }

    /// Wait for `caught_up`, then publish until shutdown: `busy` between
    /// deliveries, `idle` when nothing was delivered.
    pub async fn run(
        mut self,
        mut caught_up: ReadyWaiter,
        busy: Duration,
        idle: Duration,
        mut shutdown: ShutdownToken,
    ) {
        if !caught_up.is_ready() {
            tracing::info!("publisher waiting for processor to catch up");
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("publisher stopped before processor caught up");
                    return;
                }
                ready = caught_up.wait() => {
                    if !ready {
                        tracing::warn!("processor stopped before catching up, publisher exiting");
                        return;
                    }
                }
            }
        }

        tracing::info!(dry_run = self.dry_run, "publisher starting");
        while !shutdown.is_shutdown() {
            let interval = match self.publish_next().await {
                Ok(PublishOutcome::Published(_) | PublishOutcome::DryRun(_)) => busy,
                Ok(PublishOutcome::Idle | PublishOutcome::Failed(_)) => idle,
                Err(e) => {
                    tracing::error!(error = %e, "report store failure while publishing");
                    self.metrics.publish_failures.inc();
                    idle
                }
            };
            if shutdown.sleep(interval).await {
                break;
            }
        }
        tracing::info!("publisher stopped");
    }
}
