//! EMBER node: tracks ETH burned since London.
//!
//! Three loops cooperate through the record cache and the report queue:
//! - the puller copies blocks and their uncles from a JSON-RPC ledger into
//!   the record cache
//! - the processor folds cached records into hourly and daily aggregates and
//!   cumulative-burn thresholds, and queues reports
//! - the publisher delivers queued reports and marks them published

pub mod config;
pub mod error;
pub mod metrics;
pub mod node;
pub mod processor;
pub mod publisher;
pub mod puller;
pub mod reader;
pub mod readiness;
pub mod render;
pub mod report;
pub mod shutdown;
pub mod window;

pub use config::NodeConfig;
pub use error::NodeError;
pub use metrics::NodeMetrics;
pub use node::{EmberNode, Mode};
pub use processor::{Processor, ProcessorConfig, ProcessorError};
pub use publisher::{LogSink, PublishOutcome, Publisher, ReportSink, SinkError};
pub use puller::{poll_interval, CycleOutcome, Puller, PullerConfig};
pub use reader::SequentialReader;
pub use readiness::{ReadySignal, ReadyWaiter};
pub use render::{ArtifactRenderer, SvgRenderer};
pub use shutdown::{ShutdownController, ShutdownToken};
pub use window::{aggregate, AggregateSnapshot, RetainedWindow};
