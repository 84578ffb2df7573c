//! Crawler module: traversal of the three-level listing site
//!
//! This module contains the core crawling logic, including:
//! - Fault classification and the session recovery policy
//! - Frontier discovery on the catalog page
//! - Group traversal with per-child isolation
//! - Record extraction from detail pages
//! - The crawl engine that ties them together and checkpoints progress

mod catalog;
mod engine;
mod extractor;
mod fault;
mod group;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{establish_view, FrontierCatalog, FrontierNode};
pub use engine::{run_harvest, CrawlEngine};
pub use extractor::RecordExtractor;
pub use fault::{ExtractionFault, Fault, FaultScope, RetryPolicy};
pub use group::{GroupTraversal, GroupVisit};
