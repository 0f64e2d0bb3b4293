//! Crash-safe file primitives.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::FsError;

/// The temp path a write to `path` is staged at.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write `bytes` to `path` via a synced temp file and a rename.
///
/// Returns whether `path` already existed (i.e. the write was an overwrite).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<bool, FsError> {
    let existed = path.exists();
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp).map_err(|e| FsError::io(&tmp, e))?;
        file.write_all(bytes).map_err(|e| FsError::io(&tmp, e))?;
        file.sync_all().map_err(|e| FsError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| FsError::io(path, e))?;
    Ok(existed)
}

/// Read `path`, treating a missing file as `None`.
///
/// A zero-length file can only be left behind by a crash outside the
/// temp-then-rename discipline; it is deleted and reported as `None` so the
/// entry is fetched again.
pub fn read_nonempty(path: &Path) -> Result<Option<Vec<u8>>, FsError> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(FsError::io(path, e)),
    };
    if metadata.len() == 0 {
        tracing::warn!(path = %path.display(), "deleting empty cache file");
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(FsError::io(path, e)),
        }
        return Ok(None);
    }
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FsError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.json");
        assert!(!write_atomic(&path, b"{}").unwrap());
        assert!(write_atomic(&path, b"{ }").unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"{ }");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn empty_file_is_deleted_and_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2.json");
        File::create(&path).unwrap();
        assert_eq!(read_nonempty(&path).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_nonempty(&dir.path().join("3.json")).unwrap(), None);
    }
}
