//! Group traversal: visiting every child listed on one frontier node's page

use crate::config::Config;
use crate::crawler::catalog::FrontierNode;
use crate::crawler::extractor::RecordExtractor;
use crate::crawler::fault::{Fault, FaultScope};
use crate::record::Record;
use crate::session::{PageSession, SessionError};
use std::time::Duration;

/// Outcome of visiting one frontier node
#[derive(Debug, Clone, Default)]
pub struct GroupVisit {
    /// Successfully extracted records, in child order
    pub records: Vec<Record>,
    pub children_found: usize,
    pub stale_skips: usize,
    pub extraction_faults: usize,
    /// The results marker never appeared; no children were visited
    pub timed_out: bool,
}

/// Walks the children of a frontier node
#[derive(Debug, Clone)]
pub struct GroupTraversal {
    extractor: RecordExtractor,
    results_marker: String,
    child_links: String,
    group_timeout: Duration,
}

impl GroupTraversal {
    pub fn new(
        extractor: RecordExtractor,
        results_marker: impl Into<String>,
        child_links: impl Into<String>,
        group_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            results_marker: results_marker.into(),
            child_links: child_links.into(),
            group_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RecordExtractor::from_config(config),
            &config.markers.results,
            &config.markers.child_links,
            Duration::from_secs(config.timeouts.group_secs),
        )
    }

    /// Visits `node` and extracts a record from each of its children
    ///
    /// A results marker that never appears abandons the node with an empty,
    /// `timed_out` visit. Stale children and failed extractions are skipped.
    /// Only session loss and other node-level failures are returned as errors.
    pub async fn visit<S: PageSession + ?Sized>(
        &self,
        session: &mut S,
        node: &FrontierNode,
    ) -> Result<GroupVisit, Fault> {
        let mut visit = GroupVisit::default();

        session
            .navigate(&node.url)
            .await
            .map_err(|e| Fault::at_node(&node.url, e))?;

        if let Err(e) = session
            .wait_for_marker(&self.results_marker, self.group_timeout)
            .await
        {
            return match Fault::at_node(&node.url, e) {
                fault @ Fault::GroupTimeout { .. } => {
                    tracing::warn!("Abandoning frontier node {}: {}", node.index, fault);
                    visit.timed_out = true;
                    Ok(visit)
                }
                fault => Err(fault),
            };
        }

        let count = session
            .find_all(&self.child_links)
            .await
            .map_err(|e| Fault::at_node(&node.url, e))?
            .len();
        visit.children_found = count;
        tracing::info!("Found {} listings in frontier node {}", count, node.index);

        for position in 0..count {
            match self.visit_child(session, position).await {
                Ok(record) => {
                    tracing::info!(
                        "[{}/{}] {} | {} | {} beds, {} baths, {} sqft",
                        position + 1,
                        count,
                        record.price,
                        record.address,
                        record.beds,
                        record.baths,
                        record.sqft
                    );
                    visit.records.push(record);
                }
                Err(fault) if fault.scope() == FaultScope::Child => {
                    tracing::warn!("[{}/{}] Skipped: {}", position + 1, count, fault);
                    match fault {
                        Fault::StaleChild { .. } => visit.stale_skips += 1,
                        _ => visit.extraction_faults += 1,
                    }
                }
                Err(fault) => return Err(fault),
            }
        }

        Ok(visit)
    }

    /// Re-reads the child list, follows the link at `position` and comes
    /// back to the results page
    async fn visit_child<S: PageSession + ?Sized>(
        &self,
        session: &mut S,
        position: usize,
    ) -> Result<Record, Fault> {
        let children = session
            .find_all(&self.child_links)
            .await
            .map_err(|e| Fault::at_child(position, e))?;
        let child = children
            .get(position)
            .ok_or(Fault::StaleChild { position })?;

        let href = session
            .attribute(child, "href")
            .map_err(|e| Fault::at_child(position, e))?
            .ok_or_else(|| {
                Fault::at_child(
                    position,
                    SessionError::NoSuchElement {
                        selector: format!("{}[href]", self.child_links),
                    },
                )
            })?;

        let outcome = self.extractor.extract(session, &href).await;
        if let Err(fault) = &outcome {
            if fault.source.is_session_lost() {
                return Err(Fault::Session(fault.source.clone()));
            }
        }

        self.return_to_results(session).await?;
        outcome.map_err(Fault::from)
    }

    async fn return_to_results<S: PageSession + ?Sized>(
        &self,
        session: &mut S,
    ) -> Result<(), Fault> {
        let result = match session.back().await {
            Ok(()) => {
                session
                    .wait_for_marker(&self.results_marker, self.group_timeout)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_session_lost() => Err(Fault::Session(e)),
            Err(e) => {
                tracing::warn!("Could not return to results page: {}", e);
                Ok(())
            }
        }
    }
}
