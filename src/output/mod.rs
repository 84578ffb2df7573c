//! Output module for user-visible run reports
//!
//! This module handles:
//! - Counting what a run did ([`RunStatistics`])
//! - Printing the completion summary
//! - Printing the stored checkpoint for `--status`

pub mod stats;

pub use stats::{print_run_summary, RunStatistics};

use crate::checkpoint::CheckpointState;

/// Prints the stored checkpoint to stdout
pub fn print_checkpoint_status(state: &CheckpointState) {
    println!("=== Checkpoint ===\n");
    println!("  Last flushed index: {}", state.last_completed_index);
    println!("  Records in snapshot: {}", state.records.len());

    if let Some(last) = state.records.last() {
        println!("  Last record: {} ({})", last.address, last.link);
    }
}
