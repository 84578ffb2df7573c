//! HTTP-backed page session
//!
//! This module implements [`PageSession`] on top of plain HTTP requests:
//! - Building HTTP clients with proper user agent strings
//! - Fetching pages and keeping a navigation history for `back`
//! - Polling for structural markers with a bounded wait
//! - Snapshotting matched elements, with `href`s resolved to absolute URLs
//! - Classifying failures into navigation errors vs. a lost session

use crate::config::{Config, UserAgentConfig};
use crate::session::{ElementHandle, PageSession, SessionError, SessionFactory, SessionResult};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Creates [`HttpSession`]s, each with its own HTTP client
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    user_agent: UserAgentConfig,
    poll_interval: Duration,
}

impl HttpSessionFactory {
    pub fn new(user_agent: UserAgentConfig, poll_interval: Duration) -> Self {
        Self {
            user_agent,
            poll_interval,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.user_agent.clone(), config.crawler.poll_interval())
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    async fn acquire(&self) -> SessionResult<HttpSession> {
        let client = build_http_client(&self.user_agent)
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        tracing::debug!("Started HTTP session");
        Ok(HttpSession::new(client, self.poll_interval))
    }
}

/// A page session that loads pages over HTTP
pub struct HttpSession {
    client: Client,
    poll_interval: Duration,
    history: Vec<Url>,
    document: Option<String>,
    generation: u64,
    closed: bool,
}

impl HttpSession {
    pub fn new(client: Client, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
            history: Vec::new(),
            document: None,
            generation: 0,
            closed: false,
        }
    }

    /// URL of the currently loaded page
    pub fn current_url(&self) -> Option<&Url> {
        self.history.last()
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    /// Resolves `url` against the current page
    fn resolve(&self, url: &str) -> SessionResult<Url> {
        let parsed = match self.current_url() {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        parsed.map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetches `url` and returns its body
    async fn fetch(&self, url: &Url) -> SessionResult<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_request_error(url, e))
    }

    /// Replaces the loaded page, invalidating every outstanding handle
    fn load(&mut self, body: String) {
        self.document = Some(body);
        self.generation += 1;
    }

    /// Re-fetches the current page
    async fn reload(&mut self) -> SessionResult<()> {
        let url = self
            .current_url()
            .cloned()
            .ok_or_else(no_page_loaded)?;
        let body = self.fetch(&url).await?;
        self.load(body);
        Ok(())
    }

    fn marker_present(&self, marker: &str) -> SessionResult<bool> {
        let selector = parse_selector(marker)?;
        let Some(body) = &self.document else {
            return Ok(false);
        };
        let document = Html::parse_document(body);
        let present = document.select(&selector).next().is_some();
        Ok(present)
    }

    fn snapshot(&self, selector: &str) -> SessionResult<Vec<ElementHandle>> {
        let parsed = parse_selector(selector)?;
        let body = self.document.as_ref().ok_or_else(no_page_loaded)?;
        let base = self.current_url();
        let document = Html::parse_document(body);

        let handles = document
            .select(&parsed)
            .enumerate()
            .map(|(position, element)| {
                let text = element
                    .text()
                    .flat_map(str::split_whitespace)
                    .collect::<Vec<_>>()
                    .join(" ");

                let attributes = element
                    .value()
                    .attrs()
                    .map(|(name, value)| {
                        let value = match (name, base) {
                            ("href", Some(base)) => base
                                .join(value)
                                .map(|u| u.to_string())
                                .unwrap_or_else(|_| value.to_string()),
                            _ => value.to_string(),
                        };
                        (name.to_string(), value)
                    })
                    .collect::<HashMap<_, _>>();

                ElementHandle::new(self.generation, position, text, attributes)
            })
            .collect();

        Ok(handles)
    }
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.ensure_open()?;
        let target = self.resolve(url)?;
        tracing::debug!("Navigating to {}", target);

        match self.fetch(&target).await {
            Ok(body) => {
                self.history.push(target);
                self.load(body);
                Ok(())
            }
            Err(e) if e.is_session_lost() => Err(e),
            Err(e) => {
                // The failed URL still becomes the current page, so `back`
                // returns to where the navigation started
                self.history.push(target);
                self.load(String::new());
                Err(e)
            }
        }
    }

    async fn wait_for_marker(&mut self, marker: &str, timeout: Duration) -> SessionResult<()> {
        self.ensure_open()?;
        let deadline = Instant::now() + timeout;

        loop {
            if self.marker_present(marker)? {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::Timeout {
                    marker: marker.to_string(),
                    timeout,
                });
            }

            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;

            match self.reload().await {
                Ok(()) => {}
                Err(e) if e.is_session_lost() => return Err(e),
                Err(e) => tracing::debug!("Reload while waiting for '{}' failed: {}", marker, e),
            }
        }
    }

    async fn find_all(&mut self, selector: &str) -> SessionResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        self.snapshot(selector)
    }

    async fn back(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        if self.history.len() < 2 {
            return Err(SessionError::Navigation {
                url: "history".to_string(),
                message: "no previous page".to_string(),
            });
        }

        self.history.pop();
        self.reload().await
    }

    async fn quit(&mut self) -> SessionResult<()> {
        if !self.closed {
            tracing::debug!("Closing HTTP session");
        }
        self.closed = true;
        self.history.clear();
        self.document = None;
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

fn parse_selector(selector: &str) -> SessionResult<Selector> {
    Selector::parse(selector).map_err(|_| SessionError::InvalidSelector(selector.to_string()))
}

fn no_page_loaded() -> SessionError {
    SessionError::Navigation {
        url: "about:blank".to_string(),
        message: "no page loaded".to_string(),
    }
}

/// Connection-level failures mean the session can no longer reach anything
fn classify_request_error(url: &Url, error: reqwest::Error) -> SessionError {
    if error.is_connect() {
        SessionError::Lost(format!("connection to {} failed: {}", url, error))
    } else if error.is_timeout() {
        SessionError::Navigation {
            url: url.to_string(),
            message: "request timeout".to_string(),
        }
    } else {
        SessionError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
