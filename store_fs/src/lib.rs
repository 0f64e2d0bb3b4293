//! Filesystem storage backend for EMBER.
//!
//! Implements the storage traits from `ember-store` on a plain directory tree.
//! There is no manifest or index file: the existence of a path is the only
//! metadata, and every write goes through a temp file plus `rename` so readers
//! never observe a partial entry.

pub mod atomic;
pub mod error;
pub mod layout;
pub mod record;
pub mod report;

pub use error::FsError;
pub use layout::DataLayout;
pub use record::FsRecordStore;
pub use report::FsReportStore;
