//! Checkpoint module for persisting crawl progress
//!
//! A checkpoint has two parts:
//! - the index of the last flushed frontier node (a plain-text integer)
//! - a snapshot of every record collected so far (CSV, fully rewritten)
//!
//! On startup only the index is read back. The snapshot is never reloaded
//! into the crawler's working set, so a resumed run starts collecting from
//! empty and its first flush replaces the earlier snapshot. Records from an
//! interrupted run survive only if the previous snapshot is copied aside
//! before resuming (see [`FileCheckpointStore::read_snapshot`]).

mod file;
mod traits;

pub use file::FileCheckpointStore;
pub use traits::{CheckpointError, CheckpointResult, CheckpointStore};

use crate::config::OutputConfig;
use crate::record::Record;

/// Opens the file-backed store described by the output configuration
pub fn open_store(config: &OutputConfig) -> FileCheckpointStore {
    FileCheckpointStore::new(&config.state_path, &config.records_path)
}

/// Everything a checkpoint holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointState {
    /// Index of the last frontier node that was flushed
    pub last_completed_index: usize,

    /// Records collected by the run that wrote the checkpoint
    pub records: Vec<Record>,
}
