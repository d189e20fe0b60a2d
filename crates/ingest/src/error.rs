use linea_storage::StoreError;
use thiserror::Error;

use crate::watcher::WatcherState;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("read task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("incomplete record, missing: {}", missing.join(", "))]
    Incomplete { missing: Vec<String> },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("watcher already active (state: {0:?})")]
    AlreadyRunning(WatcherState),

    #[error("watcher must be started from within a tokio runtime")]
    NoRuntime,
}
