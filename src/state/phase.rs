/// Phase definitions for the crawl engine's state machine
use crate::HarvestError;
use std::fmt;

/// Represents where the crawl engine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Reading the resume index
    Init,

    /// Acquiring a session and loading the catalog page
    EstablishView,

    /// Processing the frontier node at this index
    Iterate(usize),

    /// Writing a periodic checkpoint after this node
    Flush(usize),

    /// All nodes handled; final flush and session release
    Done,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The frontier index this phase refers to, if any
    pub fn node_index(&self) -> Option<usize> {
        match self {
            Self::Iterate(i) | Self::Flush(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns true if the engine may move from `self` to `next`
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;

        match (*self, next) {
            (Init, EstablishView) => true,
            // Initial entry into the loop, or a retry after a rebuild
            (EstablishView, Iterate(_)) | (EstablishView, Done) => true,
            // Another rebuild attempt after a failed one
            (EstablishView, EstablishView) => true,
            (Iterate(i), Iterate(j)) => j == i + 1,
            (Iterate(i), Flush(j)) => i == j,
            (Iterate(_), EstablishView) | (Iterate(_), Done) => true,
            (Flush(i), Iterate(j)) => j == i + 1,
            (Flush(_), Done) => true,
            _ => false,
        }
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow
    pub fn transition(self, next: CrawlPhase) -> Result<CrawlPhase, HarvestError> {
        if self.can_transition_to(next) {
            tracing::trace!("Phase {} -> {}", self, next);
            Ok(next)
        } else {
            Err(HarvestError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::EstablishView => write!(f, "ESTABLISH_VIEW"),
            Self::Iterate(i) => write!(f, "ITERATE({})", i),
            Self::Flush(i) => write!(f, "FLUSH({})", i),
            Self::Done => write!(f, "DONE"),
        }
    }
}
