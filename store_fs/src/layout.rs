//! On-disk layout of the data directory.
//!
//! ```text
//! <root>/blocks/<n>.json                 block record
//! <root>/blocks/<n>_uncle<i>.json        uncle i of block n
//! <root>/reports/pending/report_<label>.txt
//! <root>/reports/pending/report_<label>.<ext>   optional artifact
//! <root>/reports/published/...           same names, after publishing
//! ```

use std::path::{Path, PathBuf};

use ember_types::BlockNumber;

use crate::FsError;

const REPORT_PREFIX: &str = "report_";
const REPORT_TEXT_EXT: &str = "txt";

/// Resolves every path under a data directory.
#[derive(Clone, Debug)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn blocks_dir(&self) -> PathBuf {
        self.root.join("blocks")
    }

    pub fn block_path(&self, number: BlockNumber) -> PathBuf {
        self.blocks_dir().join(format!("{number}.json"))
    }

    pub fn uncle_path(&self, owner: BlockNumber, index: u32) -> PathBuf {
        self.blocks_dir().join(format!("{owner}_uncle{index}.json"))
    }

    pub fn pending_dir(&self) -> PathBuf {
        self.root.join("reports").join("pending")
    }

    pub fn published_dir(&self) -> PathBuf {
        self.root.join("reports").join("published")
    }

    pub fn report_text_path(dir: &Path, label: &str) -> PathBuf {
        dir.join(format!("{REPORT_PREFIX}{label}.{REPORT_TEXT_EXT}"))
    }

    pub fn report_artifact_path(dir: &Path, label: &str, extension: &str) -> PathBuf {
        dir.join(format!("{REPORT_PREFIX}{label}.{extension}"))
    }

    /// The label of a report text file name, or `None` for any other file.
    pub fn label_of(file_name: &str) -> Option<&str> {
        file_name
            .strip_prefix(REPORT_PREFIX)?
            .strip_suffix(REPORT_TEXT_EXT)?
            .strip_suffix('.')
    }

    /// Create every directory of the layout.
    pub fn create_dirs(&self) -> Result<(), FsError> {
        for dir in [self.blocks_dir(), self.pending_dir(), self.published_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| FsError::io(&dir, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_paths() {
        let layout = DataLayout::new("/data");
        assert_eq!(layout.block_path(55), PathBuf::from("/data/blocks/55.json"));
        assert_eq!(
            layout.uncle_path(55, 1),
            PathBuf::from("/data/blocks/55_uncle1.json")
        );
    }

    #[test]
    fn report_labels_round_trip_through_file_names() {
        let dir = PathBuf::from("/data/reports/pending");
        let path = DataLayout::report_text_path(&dir, "2021-11-12T05:00UTC");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(DataLayout::label_of(name), Some("2021-11-12T05:00UTC"));
        assert_eq!(DataLayout::label_of("report_10000.svg"), None);
        assert_eq!(DataLayout::label_of("notes.txt"), None);
    }
}
