use std::path::PathBuf;

use crate::key::StoreKey;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be opened at the given location.
    #[error("cannot open object store at {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: Box<StoreError>,
    },

    /// The requested entry does not exist.
    #[error("object not found: {0}")]
    NotFound(StoreKey),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not an object store (bad magic or version).
    #[error("unrecognized store format: {0}")]
    Format(String),

    /// A complete record failed its integrity check.
    #[error("corrupt record at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
}

impl StoreError {
    /// Wrap an error raised while opening `path`.
    pub fn init(path: impl Into<PathBuf>, source: StoreError) -> Self {
        Self::Init {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
