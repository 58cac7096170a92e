//! Append-only time-series store.
//!
//! Single-writer pattern: every append through one [`TimeSeriesStore`] takes
//! an in-process lock, and the scheduler never runs two cycles at once. No
//! cross-process locking is performed.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::storage::types::parse_timestamp;
use crate::storage::{LatencySample, StorageError};

/// Samples loaded from the log, with a count of lines that were not records.
#[derive(Debug, Clone, Default)]
pub struct SampleLog {
    /// Valid samples in file order.
    pub samples: Vec<LatencySample>,
    /// Non-blank lines that could not be parsed (header excluded).
    pub skipped: usize,
    /// Whether a header row was found and ignored.
    pub had_header: bool,
}

impl SampleLog {
    /// Number of valid samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the log holds no valid samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Append-only CSV log of latency samples.
///
/// All methods do blocking file I/O. Async callers run them on the blocking
/// pool (`tokio::task::spawn_blocking`).
#[derive(Debug)]
pub struct TimeSeriesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TimeSeriesStore {
    /// Create a store for the log at `path`. Nothing is touched until the
    /// first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one sample as a new line.
    ///
    /// The record is formatted before the file is opened and written with a
    /// single call, so a failed cycle never leaves a half-built record from
    /// this process behind. The handle is closed on every return path.
    ///
    /// # Errors
    /// Returns `StorageError` if the directory cannot be created or the file
    /// cannot be opened or written.
    pub fn append(&self, sample: &LatencySample) -> Result<(), StorageError> {
        let line = format!("\n{}", sample.to_record());

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StorageError::Open {
                path: self.path.clone(),
                source,
            })?;

        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), record = %line.trim_start(), "Sample appended");
        Ok(())
    }

    /// Read every record in the log.
    ///
    /// Blank lines are ignored. A first non-blank line whose leading field is
    /// not a timestamp is treated as a header. Any other unparseable line,
    /// including one that is not valid UTF-8 or holds a value that is not a
    /// finite, non-negative number, is counted in [`SampleLog::skipped`] and
    /// logged.
    ///
    /// # Errors
    /// Returns `StorageError::Missing` if the file does not exist, or
    /// `StorageError::Read` on I/O failure.
    pub fn read_log(&self) -> Result<SampleLog, StorageError> {
        let file = File::open(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StorageError::Missing {
                    path: self.path.clone(),
                }
            } else {
                StorageError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let mut log = SampleLog::default();
        let mut seen_content = false;

        for (idx, bytes) in BufReader::new(file).split(b'\n').enumerate() {
            let bytes = bytes.map_err(|source| StorageError::Read {
                path: self.path.clone(),
                source,
            })?;
            let line = match String::from_utf8(bytes) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        error = %e,
                        "Skipping record that is not valid UTF-8"
                    );
                    seen_content = true;
                    log.skipped += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let first = !seen_content;
            seen_content = true;

            match LatencySample::from_record(&line) {
                Ok(sample) => log.samples.push(sample),
                Err(_) if first && !starts_with_timestamp(&line) => {
                    tracing::debug!(path = %self.path.display(), "Skipping header row");
                    log.had_header = true;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        error = %e,
                        "Skipping malformed record"
                    );
                    log.skipped += 1;
                }
            }
        }

        Ok(log)
    }

    fn ensure_parent_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

fn starts_with_timestamp(line: &str) -> bool {
    line.split(',')
        .next()
        .and_then(parse_timestamp)
        .is_some()
}
