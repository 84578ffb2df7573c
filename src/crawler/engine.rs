//! Crawl engine - the resumable traversal state machine
//!
//! The engine owns the session, the working set of records and the
//! checkpoint store. It walks the frontier catalog from the resume index,
//! delegates each node to [`GroupTraversal`], recovers from session loss
//! according to the [`RetryPolicy`] and flushes a checkpoint every
//! `checkpoint-every` completed nodes and once more at the end.

use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::config::{Config, ExhaustedAction, MarkerConfig};
use crate::crawler::catalog::{establish_view, FrontierCatalog, FrontierNode};
use crate::crawler::fault::{Fault, FaultScope, RetryPolicy};
use crate::crawler::group::{GroupTraversal, GroupVisit};
use crate::output::{print_run_summary, RunStatistics};
use crate::record::Record;
use crate::session::{HttpSessionFactory, PageSession, SessionFactory};
use crate::state::CrawlPhase;
use crate::{HarvestError, Result};
use std::time::Duration;

/// Main crawl engine structure
pub struct CrawlEngine<F: SessionFactory, C: CheckpointStore> {
    factory: F,
    store: C,
    traversal: GroupTraversal,
    entry_url: String,
    markers: MarkerConfig,
    catalog_timeout: Duration,
    checkpoint_every: usize,
    policy: RetryPolicy,
    phase: CrawlPhase,
    records: Vec<Record>,
    stats: RunStatistics,
}

impl<F: SessionFactory, C: CheckpointStore> CrawlEngine<F, C> {
    pub fn new(config: &Config, factory: F, store: C) -> Self {
        Self {
            factory,
            store,
            traversal: GroupTraversal::from_config(config),
            entry_url: config.crawler.entry_url.clone(),
            markers: config.markers.clone(),
            catalog_timeout: Duration::from_secs(config.timeouts.catalog_secs),
            checkpoint_every: config.crawler.checkpoint_every.max(1),
            policy: RetryPolicy::from_config(&config.session_retry),
            phase: CrawlPhase::Init,
            records: Vec::new(),
            stats: RunStatistics::default(),
        }
    }

    /// Replaces the recovery policy taken from the configuration
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Records collected by the current (or last) run
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    /// Runs the crawl from the stored resume index to the end of the catalog
    ///
    /// Fails only if the initial session or catalog view cannot be
    /// established, if retries run out under an `abort` policy, or if the
    /// final checkpoint cannot be written.
    pub async fn run(&mut self) -> Result<RunStatistics> {
        self.phase = CrawlPhase::Init;
        self.records.clear();
        self.stats = RunStatistics::start();

        let resume_index = self.store.load_resume_index()?;
        if resume_index > 0 {
            tracing::info!("Resuming from frontier index {}", resume_index);
        } else {
            tracing::info!("No checkpoint found, starting from the first frontier node");
        }

        self.advance(CrawlPhase::EstablishView)?;
        let mut session = self.factory.acquire().await?;
        let catalog = match self.open_catalog(&mut session).await {
            Ok(catalog) => catalog,
            Err(fault) => {
                release(&mut session).await;
                return Err(fault.into());
            }
        };

        let start = if resume_index > catalog.len() {
            tracing::warn!(
                "Checkpoint index {} is past the end of the catalog ({} nodes)",
                resume_index,
                catalog.len()
            );
            catalog.len()
        } else {
            resume_index
        };
        self.stats.nodes_total = catalog.len();
        self.stats.resume_index = start;

        for node in catalog.nodes_from(start) {
            self.advance(CrawlPhase::Iterate(node.index))?;

            match self.process_node(&mut session, node).await {
                Ok(()) => {
                    if node.index % self.checkpoint_every == 0 {
                        self.periodic_flush(node.index)?;
                    }
                }
                Err(fault) if fault.scope() == FaultScope::Session => {
                    tracing::warn!("Frontier node {}: {}", node.index, fault);
                    if let Err(e) = self.recover(&mut session, node).await {
                        release(&mut session).await;
                        return Err(e);
                    }
                }
                Err(fault) => {
                    tracing::warn!("Skipping frontier node {}: {}", node.index, fault);
                    self.stats.nodes_failed += 1;
                }
            }
        }

        self.advance(CrawlPhase::Done)?;
        let flushed = self.store.flush(catalog.len(), &self.records);
        release(&mut session).await;
        self.stats.finish();

        match flushed {
            Ok(()) => self.stats.flushes += 1,
            Err(e) => {
                tracing::error!("Final checkpoint failed: {}", e);
                return Err(e.into());
            }
        }

        tracing::info!(
            "Harvest complete: {} records from {} frontier nodes",
            self.records.len(),
            catalog.len()
        );
        Ok(self.stats.clone())
    }

    fn advance(&mut self, next: CrawlPhase) -> Result<()> {
        self.phase = self.phase.transition(next)?;
        Ok(())
    }

    async fn open_catalog(
        &self,
        session: &mut F::Session,
    ) -> std::result::Result<FrontierCatalog, Fault> {
        establish_view(
            session,
            &self.entry_url,
            &self.markers.catalog,
            self.catalog_timeout,
        )
        .await?;
        FrontierCatalog::discover(session, &self.markers).await
    }

    /// Visits one node, keeps its records and returns to the catalog
    ///
    /// The catalog view is restored after node-level faults too, so the
    /// next node starts from the same place. Only session loss skips it.
    async fn process_node(
        &mut self,
        session: &mut F::Session,
        node: &FrontierNode,
    ) -> std::result::Result<(), Fault> {
        tracing::debug!("Visiting frontier node {}: {}", node.index, node.url);
        let fault = match self.traversal.visit(session, node).await {
            Ok(visit) => {
                self.record_visit(visit);
                return self.return_to_catalog(session).await;
            }
            Err(fault) if fault.scope() == FaultScope::Session => return Err(fault),
            Err(fault) => fault,
        };

        self.return_to_catalog(session).await?;
        Err(fault)
    }

    /// Goes back to the catalog page, reloading the entry URL if history
    /// does not lead there
    async fn return_to_catalog(
        &self,
        session: &mut F::Session,
    ) -> std::result::Result<(), Fault> {
        let back = match session.back().await {
            Ok(()) => {
                session
                    .wait_for_marker(&self.markers.catalog, self.catalog_timeout)
                    .await
            }
            Err(e) => Err(e),
        };

        match back {
            Ok(()) => return Ok(()),
            Err(e) if e.is_session_lost() => return Err(Fault::Session(e)),
            Err(e) => tracing::debug!("Back to catalog failed, reloading entry page: {}", e),
        }

        let reload = match session.navigate(&self.entry_url).await {
            Ok(()) => {
                session
                    .wait_for_marker(&self.markers.catalog, self.catalog_timeout)
                    .await
            }
            Err(e) => Err(e),
        };
        reload.map_err(|e| {
            if e.is_session_lost() {
                Fault::Session(e)
            } else {
                Fault::Other {
                    url: self.entry_url.clone(),
                    source: e,
                }
            }
        })
    }

    fn record_visit(&mut self, visit: GroupVisit) {
        self.stats.nodes_visited += 1;
        if visit.timed_out {
            self.stats.nodes_timed_out += 1;
        }
        self.stats.stale_children += visit.stale_skips;
        self.stats.extraction_faults += visit.extraction_faults;
        self.stats.records_extracted += visit.records.len();
        self.records.extend(visit.records);
    }

    /// Rebuilds the session and retries `node` as the policy allows
    async fn recover(&mut self, session: &mut F::Session, node: &FrontierNode) -> Result<()> {
        let mut attempt = 1;

        while self.policy.allows_attempt(attempt) {
            self.advance(CrawlPhase::EstablishView)?;
            self.stats.session_rebuilds += 1;
            tracing::warn!(
                "Rebuilding session for frontier node {} (attempt {}/{})",
                node.index,
                attempt,
                self.policy.max_attempts
            );

            if let Err(e) = self.rebuild(session).await {
                tracing::warn!("Session rebuild failed: {}", e);
                attempt += 1;
                continue;
            }

            if !self.policy.backoff_delay.is_zero() {
                tokio::time::sleep(self.policy.backoff_delay).await;
            }

            self.advance(CrawlPhase::Iterate(node.index))?;
            match self.process_node(session, node).await {
                Ok(()) => {
                    tracing::info!("Frontier node {} recovered", node.index);
                    return Ok(());
                }
                Err(fault) if fault.scope() == FaultScope::Session => {
                    tracing::warn!(
                        "Retry of frontier node {} lost the session: {}",
                        node.index,
                        fault
                    );
                    attempt += 1;
                }
                Err(fault) => {
                    tracing::warn!("Retry of frontier node {} failed: {}", node.index, fault);
                    self.stats.nodes_failed += 1;
                    return Ok(());
                }
            }
        }

        match self.policy.on_exhausted {
            ExhaustedAction::Continue => {
                tracing::warn!(
                    "Giving up on frontier node {} after {} session rebuild(s)",
                    node.index,
                    self.policy.max_attempts
                );
                self.stats.nodes_failed += 1;
                Ok(())
            }
            ExhaustedAction::Abort => Err(HarvestError::RetriesExhausted { index: node.index }),
        }
    }

    /// Replaces `session` with a fresh one showing the catalog
    async fn rebuild(&self, session: &mut F::Session) -> Result<()> {
        release(session).await;
        *session = self.factory.acquire().await?;
        establish_view(
            session,
            &self.entry_url,
            &self.markers.catalog,
            self.catalog_timeout,
        )
        .await?;
        Ok(())
    }

    fn periodic_flush(&mut self, index: usize) -> Result<()> {
        self.advance(CrawlPhase::Flush(index))?;
        match self.store.flush(index, &self.records) {
            Ok(()) => self.stats.flushes += 1,
            Err(e) => tracing::error!("Checkpoint at frontier index {} failed: {}", index, e),
        }
        Ok(())
    }
}

async fn release<S: PageSession + ?Sized>(session: &mut S) {
    if let Err(e) = session.quit().await {
        tracing::debug!("Error while closing session: {}", e);
    }
}

/// Runs a complete harvest over HTTP and prints the completion summary
pub async fn run_harvest(config: &Config, store: FileCheckpointStore) -> Result<RunStatistics> {
    let factory = HttpSessionFactory::from_config(config);
    let mut engine = CrawlEngine::new(config, factory, store);

    let stats = engine.run().await?;
    print_run_summary(&stats);
    println!(
        "\nHarvest completed. Data saved to {}",
        engine.store().records_path().display()
    );
    Ok(stats)
}
