//! Record extraction from a single detail page

use crate::config::{Config, MarkerConfig};
use crate::crawler::fault::ExtractionFault;
use crate::record::{RawListing, Record};
use crate::session::{all_texts, first_text, optional_text, PageSession, SessionResult};
use std::time::Duration;

/// Turns one detail page into a [`Record`]
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    markers: MarkerConfig,
    detail_timeout: Duration,
    settle_delay: Duration,
}

impl RecordExtractor {
    pub fn new(markers: MarkerConfig, detail_timeout: Duration, settle_delay: Duration) -> Self {
        Self {
            markers,
            detail_timeout,
            settle_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.markers.clone(),
            Duration::from_secs(config.timeouts.detail_secs),
            config.crawler.settle_delay(),
        )
    }

    /// Navigates to `url` and extracts its record
    ///
    /// Missing description or agent blocks fall back to placeholders. Every
    /// other failure, including a lost session, is returned as an
    /// [`ExtractionFault`] for the caller to classify.
    pub async fn extract<S: PageSession + ?Sized>(
        &self,
        session: &mut S,
        url: &str,
    ) -> Result<Record, ExtractionFault> {
        self.try_extract(session, url)
            .await
            .map_err(|source| ExtractionFault {
                url: url.to_string(),
                source,
            })
    }

    async fn try_extract<S: PageSession + ?Sized>(
        &self,
        session: &mut S,
        url: &str,
    ) -> SessionResult<Record> {
        let m = &self.markers;

        session.navigate(url).await?;
        session.wait_for_marker(&m.detail, self.detail_timeout).await?;
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let raw = RawListing {
            link: url.to_string(),
            price: first_text(session, &m.price).await?,
            address: first_text(session, &m.address).await?,
            details: first_text(session, &m.detail).await?,
            description: optional_text(session, &m.description).await?,
            features: all_texts(session, &m.features).await?,
            agent_info: optional_text(session, &m.agent).await?,
        };

        Ok(Record::from_raw(raw))
    }
}
