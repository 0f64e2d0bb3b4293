//! Filesystem-backed [`RecordStore`].

use std::path::Path;

use ember_store::{OnConflict, RecordStore, StoreError};
use ember_types::{BlockHeader, BlockNumber, ChainRecord, UncleRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::atomic::{read_nonempty, write_atomic};
use crate::{DataLayout, FsError};

/// One pretty-printed JSON file per block and per uncle.
#[derive(Clone, Debug)]
pub struct FsRecordStore {
    layout: DataLayout,
}

impl FsRecordStore {
    /// Open the store rooted at `layout`, creating its directories.
    pub fn open(layout: DataLayout) -> Result<Self, StoreError> {
        layout.create_dirs()?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<bool, FsError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| FsError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &bytes)
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, FsError> {
        let Some(bytes) = read_nonempty(path)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| FsError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }
}

fn log_write(existed: bool, on_conflict: OnConflict, what: &str, path: &Path) {
    match (existed, on_conflict) {
        (false, _) => tracing::debug!(path = %path.display(), "wrote {what}"),
        (true, OnConflict::Routine) => tracing::debug!(path = %path.display(), "overwrote {what}"),
        (true, OnConflict::Warn) => {
            tracing::warn!(path = %path.display(), "overwrote cached {what}; it was fetched again")
        }
    }
}

impl RecordStore for FsRecordStore {
    fn put_record(&self, record: &ChainRecord, on_conflict: OnConflict) -> Result<(), StoreError> {
        let path = self.layout.block_path(record.number());
        let existed = Self::write_json(&path, record)?;
        log_write(existed, on_conflict, "block", &path);
        Ok(())
    }

    fn get_record(&self, number: BlockNumber) -> Result<Option<ChainRecord>, StoreError> {
        Ok(Self::read_json(&self.layout.block_path(number))?)
    }

    fn put_uncle(&self, uncle: &UncleRecord, on_conflict: OnConflict) -> Result<(), StoreError> {
        let path = self.layout.uncle_path(uncle.owner, uncle.index);
        let existed = Self::write_json(&path, uncle)?;
        log_write(existed, on_conflict, "uncle", &path);
        Ok(())
    }

    fn get_uncle(&self, owner: BlockNumber, index: u32) -> Result<Option<UncleRecord>, StoreError> {
        Ok(Self::read_json(&self.layout.uncle_path(owner, index))?)
    }

    fn has_uncle(&self, owner: BlockNumber, index: u32) -> Result<bool, StoreError> {
        let path = self.layout.uncle_path(owner, index);
        match std::fs::metadata(&path) {
            Ok(m) => Ok(m.len() > 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FsError::io(&path, e).into()),
        }
    }
}
