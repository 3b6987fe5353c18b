use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Backing file unreadable or its header row does not match the schema.
    #[error("store corrupt at {}: {reason}", path.display())]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("record already exists: {0}")]
    DuplicateId(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("could not lock {resource} within {waited:?}")]
    LockTimeout { resource: String, waited: Duration },

    #[error("invalid search option: {0}")]
    InvalidOption(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("write rejected for record {0}")]
    Rejected(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// Writer contention is the only condition worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
