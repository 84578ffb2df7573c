//! Checkpoint store trait and error types

use crate::record::Record;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Checkpoint index file {path:?} does not hold an index: {content:?}")]
    CorruptIndex { path: PathBuf, content: String },
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Trait for checkpoint backends
pub trait CheckpointStore {
    /// Returns the frontier index to resume from, or 0 if nothing was saved
    fn load_resume_index(&self) -> CheckpointResult<usize>;

    /// Replaces the stored index and record snapshot
    ///
    /// Readers never observe a half-written checkpoint, and calling this
    /// twice with the same arguments leaves the same state behind.
    fn flush(&mut self, index: usize, records: &[Record]) -> CheckpointResult<()>;

    /// Removes any stored checkpoint
    fn clear(&mut self) -> CheckpointResult<()>;
}
