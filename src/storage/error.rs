//! Storage-specific error types.
//!
//! All storage operations return [`StorageError`] on failure, which can be
//! matched to determine the underlying cause (open, write, read, record).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Parent directory of the log could not be created.
    #[error("failed to create log directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be opened for appending.
    #[error("failed to open log file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be written completely.
    #[error("failed to write log file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log file does not exist yet.
    #[error("log file '{}' does not exist", path.display())]
    Missing { path: PathBuf },

    /// Log file could not be read.
    #[error("failed to read log file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line does not hold a valid record.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
