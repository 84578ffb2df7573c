//! Run statistics collected by the crawl engine
//!
//! This module provides the counters the engine updates while it walks the
//! catalog and the completion summary printed at the end of a run.

use chrono::{DateTime, Utc};

/// Counters for a single harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Frontier nodes in the discovered catalog
    pub nodes_total: usize,

    /// Index the run started from
    pub resume_index: usize,

    /// Frontier nodes whose children were enumerated
    pub nodes_visited: usize,

    /// Frontier nodes abandoned because their results never appeared
    pub nodes_timed_out: usize,

    /// Frontier nodes skipped after a node-level fault or exhausted retries
    pub nodes_failed: usize,

    pub stale_children: usize,
    pub extraction_faults: usize,
    pub records_extracted: usize,
    pub session_rebuilds: usize,

    /// Successful checkpoint writes, the final one included
    pub flushes: usize,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStatistics {
    /// Creates empty statistics stamped with the current time
    pub fn start() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration in seconds, if the run has finished
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some((finished - started).num_seconds()),
            _ => None,
        }
    }

    /// Skipped children of any kind
    pub fn children_skipped(&self) -> usize {
        self.stale_children + self.extraction_faults
    }
}

/// Prints the completion summary to stdout
pub fn print_run_summary(stats: &RunStatistics) {
    println!("=== Harvest Summary ===\n");

    println!("Frontier:");
    println!("  Nodes in catalog: {}", stats.nodes_total);
    println!("  Started at index: {}", stats.resume_index);
    println!("  Nodes visited: {}", stats.nodes_visited);
    println!("  Nodes timed out: {}", stats.nodes_timed_out);
    println!("  Nodes failed: {}", stats.nodes_failed);
    println!();

    println!("Listings:");
    println!("  Records extracted: {}", stats.records_extracted);
    println!(
        "  Children skipped: {} ({} stale, {} failed extraction)",
        stats.children_skipped(),
        stats.stale_children,
        stats.extraction_faults
    );
    println!();

    println!("Recovery:");
    println!("  Session rebuilds: {}", stats.session_rebuilds);
    println!("  Checkpoints written: {}", stats.flushes);

    if let Some(seconds) = stats.duration_seconds() {
        println!();
        println!("Duration: {}s", seconds);
    }
}
