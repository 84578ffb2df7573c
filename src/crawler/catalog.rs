//! Frontier catalog: the ordered list of top-level nodes

use crate::config::MarkerConfig;
use crate::crawler::fault::Fault;
use crate::session::PageSession;
use std::time::Duration;

/// A top-level catalog entry
///
/// The index is the unit of resumability: checkpoints record how far into
/// the catalog a run got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierNode {
    pub url: String,
    pub index: usize,
}

/// Frontier nodes in catalog order, discovered once per session lifetime
#[derive(Debug, Clone, Default)]
pub struct FrontierCatalog {
    nodes: Vec<FrontierNode>,
}

impl FrontierCatalog {
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let nodes = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| FrontierNode {
                url: url.into(),
                index,
            })
            .collect();
        Self { nodes }
    }

    /// Reads the catalog links off the page the session currently shows
    ///
    /// The catalog view must already be established (see [`establish_view`]).
    /// Links without an `href` are left out. Any failure that is not local to
    /// a single link ends discovery with [`Fault::Discovery`].
    pub async fn discover<S: PageSession + ?Sized>(
        session: &mut S,
        markers: &MarkerConfig,
    ) -> Result<Self, Fault> {
        let links = session
            .find_all(&markers.catalog_links)
            .await
            .map_err(|e| Fault::at_catalog(&markers.catalog_links, e))?;

        let mut urls = Vec::with_capacity(links.len());
        for link in &links {
            match session.attribute(link, "href") {
                Ok(Some(href)) if !href.trim().is_empty() => urls.push(href),
                Ok(_) => {
                    tracing::debug!("Catalog link {} has no href, skipping", link.position());
                }
                Err(e) if e.is_session_lost() => {
                    return Err(Fault::at_catalog(&markers.catalog_links, e));
                }
                Err(e) => {
                    tracing::warn!("Catalog link {} unreadable: {}", link.position(), e);
                }
            }
        }

        let catalog = Self::from_urls(urls);
        tracing::info!("Found {} frontier nodes", catalog.len());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FrontierNode> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrontierNode> {
        self.nodes.iter()
    }

    /// Nodes from `start` onwards; empty if `start` is past the end
    pub fn nodes_from(&self, start: usize) -> &[FrontierNode] {
        self.nodes.get(start..).unwrap_or(&[])
    }
}

/// Loads the entry page and waits for the catalog marker
pub async fn establish_view<S: PageSession + ?Sized>(
    session: &mut S,
    entry_url: &str,
    marker: &str,
    timeout: Duration,
) -> Result<(), Fault> {
    tracing::debug!("Opening catalog at {}", entry_url);
    session
        .navigate(entry_url)
        .await
        .map_err(|e| Fault::at_catalog(marker, e))?;
    session
        .wait_for_marker(marker, timeout)
        .await
        .map_err(|e| Fault::at_catalog(marker, e))
}
