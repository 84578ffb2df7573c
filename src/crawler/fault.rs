//! Fault taxonomy and session recovery policy
//!
//! Every failure the crawler observes is classified by the scope it affects:
//!
//! | Fault | Scope | Recovery |
//! |-------|-------|----------|
//! | `StaleChild` | child | skip the child, continue enumeration |
//! | `Extraction` | child | skip the child, continue enumeration |
//! | `GroupTimeout` | node | abandon the node's children, next node |
//! | `Other` | node | log, next node |
//! | `Session` | session | rebuild the session, retry the node per [`RetryPolicy`] |
//! | `Discovery` | run | stop the run |

use crate::config::{ExhaustedAction, RetryConfig};
use crate::session::SessionError;
use std::time::Duration;
use thiserror::Error;

/// How far the effects of a fault reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultScope {
    Child,
    Node,
    Session,
    Run,
}

/// A leaf page that could not be turned into a record
#[derive(Debug, Clone, Error)]
#[error("Extraction failed for {url}: {source}")]
pub struct ExtractionFault {
    pub url: String,
    #[source]
    pub source: SessionError,
}

/// A classified crawl failure
#[derive(Debug, Clone, Error)]
pub enum Fault {
    #[error("Catalog marker '{marker}' never appeared: {source}")]
    Discovery {
        marker: String,
        #[source]
        source: SessionError,
    },

    #[error("Child {position} went stale before it could be read")]
    StaleChild { position: usize },

    #[error("Results for {url} did not appear within {timeout:?}")]
    GroupTimeout { url: String, timeout: Duration },

    #[error(transparent)]
    Extraction(#[from] ExtractionFault),

    #[error("Session lost: {0}")]
    Session(#[source] SessionError),

    #[error("Frontier node {url} failed: {source}")]
    Other {
        url: String,
        #[source]
        source: SessionError,
    },
}

impl Fault {
    pub fn scope(&self) -> FaultScope {
        match self {
            Self::StaleChild { .. } | Self::Extraction(_) => FaultScope::Child,
            Self::GroupTimeout { .. } | Self::Other { .. } => FaultScope::Node,
            Self::Session(_) => FaultScope::Session,
            Self::Discovery { .. } => FaultScope::Run,
        }
    }

    /// Classifies an error raised while establishing the catalog view
    pub fn at_catalog(marker: &str, error: SessionError) -> Self {
        Self::Discovery {
            marker: marker.to_string(),
            source: error,
        }
    }

    /// Classifies an error raised while working on a frontier node's page
    pub fn at_node(url: &str, error: SessionError) -> Self {
        match error {
            e if e.is_session_lost() => Self::Session(e),
            SessionError::Timeout { timeout, .. } => Self::GroupTimeout {
                url: url.to_string(),
                timeout,
            },
            e => Self::Other {
                url: url.to_string(),
                source: e,
            },
        }
    }

    /// Classifies an error raised while reading the child at `position`
    pub fn at_child(position: usize, error: SessionError) -> Self {
        match error {
            e if e.is_session_lost() => Self::Session(e),
            SessionError::StaleElement { .. } => Self::StaleChild { position },
            e => Self::Extraction(ExtractionFault {
                url: format!("child #{}", position),
                source: e,
            }),
        }
    }
}

/// Recovery policy for session faults
///
/// The default rebuilds the session once, cools down for ten seconds, retries
/// the same frontier node and then moves on whatever the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rebuild-and-retry attempts per frontier node
    pub max_attempts: u32,

    /// Cool-down between re-establishing the view and retrying
    pub backoff_delay: Duration,

    pub on_exhausted: ExhaustedAction,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_delay: Duration::from_millis(config.backoff_ms),
            on_exhausted: config.on_exhausted,
        }
    }

    /// Returns true if attempt number `attempt` (1-based) may run
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
