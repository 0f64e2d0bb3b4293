//! Filesystem-backed [`ReportStore`].
//!
//! A report is complete in a stage once its text file exists there: artifacts
//! are always written and moved before the text file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ember_store::{Artifact, PendingReport, ReportStore, StoreError};

use crate::atomic::{read_nonempty, write_atomic};
use crate::{DataLayout, FsError};

#[derive(Clone, Debug)]
pub struct FsReportStore {
    layout: DataLayout,
}

impl FsReportStore {
    /// Open the store rooted at `layout`, creating its directories.
    pub fn open(layout: DataLayout) -> Result<Self, StoreError> {
        layout.create_dirs()?;
        Ok(Self { layout })
    }

    /// Artifact files of `label` in `dir` (any extension but `txt` / `tmp`).
    fn artifact_paths(dir: &Path, label: &str) -> Result<Vec<(String, PathBuf)>, FsError> {
        let prefix = format!("report_{label}.");
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FsError::io(dir, e)),
        };
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::io(dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(extension) = name.strip_prefix(&prefix) else {
                continue;
            };
            if extension == "txt" || extension.contains('.') {
                continue;
            }
            found.push((extension.to_string(), entry.path()));
        }
        Ok(found)
    }

    fn move_file(from: &Path, to: &Path) -> Result<bool, FsError> {
        match fs::rename(from, to) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FsError::io(from, e)),
        }
    }
}

impl ReportStore for FsReportStore {
    fn is_published(&self, label: &str) -> Result<bool, StoreError> {
        Ok(DataLayout::report_text_path(&self.layout.published_dir(), label).exists())
    }

    fn write_pending(&self, report: &PendingReport) -> Result<(), StoreError> {
        let dir = self.layout.pending_dir();
        if let Some(artifact) = &report.artifact {
            let path = DataLayout::report_artifact_path(&dir, &report.label, &artifact.extension);
            write_atomic(&path, &artifact.bytes)?;
        }
        let path = DataLayout::report_text_path(&dir, &report.label);
        let existed = write_atomic(&path, report.text.as_bytes())?;
        if existed {
            tracing::info!(label = %report.label, path = %path.display(), "rewrote pending report");
        } else {
            tracing::info!(label = %report.label, path = %path.display(), "wrote pending report");
        }
        Ok(())
    }

    fn pending_labels(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.layout.pending_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FsError::io(&dir, e).into()),
        };
        let mut labels = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::io(&dir, e))?;
            if let Some(label) = entry.file_name().to_str().and_then(DataLayout::label_of) {
                labels.push(label.to_string());
            }
        }
        labels.sort();
        Ok(labels)
    }

    fn read_pending(&self, label: &str) -> Result<Option<PendingReport>, StoreError> {
        let dir = self.layout.pending_dir();
        let path = DataLayout::report_text_path(&dir, label);
        let Some(bytes) = read_nonempty(&path)? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes)
            .map_err(|e| StoreError::Corruption(format!("{}: {e}", path.display())))?;

        let mut report = PendingReport::text_only(label, text);
        if let Some((extension, artifact_path)) = Self::artifact_paths(&dir, label)?.into_iter().next() {
            if let Some(bytes) = read_nonempty(&artifact_path)? {
                report = report.with_artifact(Artifact { extension, bytes });
            }
        }
        Ok(Some(report))
    }

    fn publish(&self, label: &str) -> Result<(), StoreError> {
        let pending = self.layout.pending_dir();
        let published = self.layout.published_dir();

        for (extension, from) in Self::artifact_paths(&pending, label)? {
            let to = DataLayout::report_artifact_path(&published, label, &extension);
            Self::move_file(&from, &to)?;
        }

        let from = DataLayout::report_text_path(&pending, label);
        let to = DataLayout::report_text_path(&published, label);
        if !Self::move_file(&from, &to)? {
            return Err(StoreError::NotFound(format!("pending report {label}")));
        }
        tracing::info!(label, path = %to.display(), "published report");
        Ok(())
    }
}
