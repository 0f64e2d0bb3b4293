use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode entry for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl FsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FsError> for ember_store::StoreError {
    fn from(e: FsError) -> Self {
        match e {
            FsError::Parse { .. } => ember_store::StoreError::Corruption(e.to_string()),
            FsError::Encode { .. } => ember_store::StoreError::Serialization(e.to_string()),
            FsError::Io { .. } => ember_store::StoreError::Backend(e.to_string()),
        }
    }
}
