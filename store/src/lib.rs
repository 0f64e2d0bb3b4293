//! Abstract storage traits for EMBER.
//!
//! Two durable stores connect the long-running loops:
//!
//! - [`RecordStore`]: the block/uncle cache written by the puller and read by
//!   the processor.
//! - [`ReportStore`]: the pending/published report queue written by the
//!   processor and drained by the publisher.
//!
//! Every backend (filesystem, in-memory for testing) implements these traits.
//! The rest of the codebase depends only on the traits, so a real message queue
//! can replace the filesystem without touching the loops.

pub mod error;
pub mod record;
pub mod report;

pub use error::StoreError;
pub use record::{OnConflict, RecordStore};
pub use report::{Artifact, PendingReport, ReportStore};
