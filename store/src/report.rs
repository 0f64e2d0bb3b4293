//! Report queue trait.
//!
//! Reports move through two stages. The processor writes a report to
//! *pending*; the publisher hands it to its sink and then moves it to
//! *published*. The move is the commit point: a label present in published has
//! been delivered and must never be generated again.

use crate::StoreError;

/// A binary companion to a report's text (e.g. a rendered chart).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// File extension without the dot, e.g. `"svg"`.
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// A report waiting to be published, identified by its boundary label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingReport {
    pub label: String,
    pub text: String,
    pub artifact: Option<Artifact>,
}

impl PendingReport {
    pub fn text_only(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

/// Durable pending/published report queue keyed by label.
pub trait ReportStore {
    /// Whether a report for `label` has already been published.
    fn is_published(&self, label: &str) -> Result<bool, StoreError>;

    /// Write (or overwrite) a pending report. Must not touch the published stage.
    fn write_pending(&self, report: &PendingReport) -> Result<(), StoreError>;

    /// Labels of all pending reports, sorted ascending.
    fn pending_labels(&self) -> Result<Vec<String>, StoreError>;

    /// Read a pending report back, with its artifact if one was written.
    fn read_pending(&self, label: &str) -> Result<Option<PendingReport>, StoreError>;

    /// Move a pending report (and its artifact) to published.
    fn publish(&self, label: &str) -> Result<(), StoreError>;
}
