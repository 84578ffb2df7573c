//! State module for tracking crawl progress
//!
//! The crawl engine moves through a small set of phases:
//!
//! ```text
//! INIT -> ESTABLISH_VIEW -> ITERATE(i) -> [FLUSH(i)] -> ITERATE(i+1) ... -> DONE
//!                ^               |
//!                +---------------+  (session rebuild, then retry ITERATE(i))
//! ```

mod phase;

pub use phase::CrawlPhase;
