//! Session module: the page-session capability the crawler drives
//!
//! The crawl logic only ever talks to a [`PageSession`]: a single cursor over
//! "the page currently loaded" that can navigate, wait for a structural marker,
//! enumerate elements and go back. Sessions are obtained from a
//! [`SessionFactory`] so that a lost session can be replaced by a fresh one.
//!
//! Element handles are tied to the page they were read from. Once the session
//! moves to another page (or reloads), reading from an old handle fails with
//! [`SessionError::StaleElement`].

mod http;

pub use http::{build_http_client, HttpSession, HttpSessionFactory};

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a page session
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Timed out after {timeout:?} waiting for marker '{marker}'")]
    Timeout { marker: String, timeout: Duration },

    #[error("Element at position {position} is no longer attached to the page")]
    StaleElement { position: usize },

    #[error("No element matches '{selector}'")]
    NoSuchElement { selector: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Session lost: {0}")]
    Lost(String),

    #[error("Session could not be started: {0}")]
    Unavailable(String),

    #[error("Session has been closed")]
    Closed,
}

impl SessionError {
    /// Returns true if the session itself is unusable and must be rebuilt
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::Lost(_) | Self::Closed)
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// A snapshot of one element on the page the session had loaded when the
/// element was looked up
#[derive(Debug, Clone)]
pub struct ElementHandle {
    generation: u64,
    position: usize,
    text: String,
    attributes: HashMap<String, String>,
}

impl ElementHandle {
    pub fn new(
        generation: u64,
        position: usize,
        text: impl Into<String>,
        attributes: HashMap<String, String>,
    ) -> Self {
        Self {
            generation,
            position,
            text: text.into(),
            attributes,
        }
    }

    /// Page generation this handle was read from
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Position of the element among the matches of its selector
    pub fn position(&self) -> usize {
        self.position
    }
}

/// A navigable page session
///
/// Exactly one caller drives a session at a time; the crawler passes it down
/// by `&mut` reference and never shares it.
#[async_trait]
pub trait PageSession: Send {
    /// Loads `url`, replacing the current page
    async fn navigate(&mut self, url: &str) -> SessionResult<()>;

    /// Blocks until `marker` matches on the current page or `timeout` elapses
    async fn wait_for_marker(&mut self, marker: &str, timeout: Duration) -> SessionResult<()>;

    /// Returns handles to every element matching `selector`, in document order
    async fn find_all(&mut self, selector: &str) -> SessionResult<Vec<ElementHandle>>;

    /// Returns to the previous page in the session history
    async fn back(&mut self) -> SessionResult<()>;

    /// Releases the session; any later call fails with [`SessionError::Closed`]
    async fn quit(&mut self) -> SessionResult<()>;

    /// Generation counter of the currently loaded page
    fn generation(&self) -> u64;

    /// Reads an attribute from an element on the current page
    fn attribute(&self, element: &ElementHandle, name: &str) -> SessionResult<Option<String>> {
        self.ensure_attached(element)?;
        Ok(element.attributes.get(name).cloned())
    }

    /// Reads the visible text of an element on the current page
    fn text(&self, element: &ElementHandle) -> SessionResult<String> {
        self.ensure_attached(element)?;
        Ok(element.text.clone())
    }

    /// Fails with [`SessionError::StaleElement`] if `element` belongs to an
    /// earlier page
    fn ensure_attached(&self, element: &ElementHandle) -> SessionResult<()> {
        if element.generation != self.generation() {
            return Err(SessionError::StaleElement {
                position: element.position,
            });
        }
        Ok(())
    }
}

/// Produces fresh sessions
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: PageSession;

    /// Starts a new session
    async fn acquire(&self) -> SessionResult<Self::Session>;
}

/// Text of the first element matching `selector`
pub async fn first_text<S: PageSession + ?Sized>(
    session: &mut S,
    selector: &str,
) -> SessionResult<String> {
    let elements = session.find_all(selector).await?;
    let first = elements
        .first()
        .ok_or_else(|| SessionError::NoSuchElement {
            selector: selector.to_string(),
        })?;
    session.text(first)
}

/// Text of the first element matching `selector`, or `None` if nothing matches
///
/// Session-level failures still propagate.
pub async fn optional_text<S: PageSession + ?Sized>(
    session: &mut S,
    selector: &str,
) -> SessionResult<Option<String>> {
    match first_text(session, selector).await {
        Ok(text) => Ok(Some(text)),
        Err(SessionError::NoSuchElement { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Texts of every element matching `selector`, in document order
pub async fn all_texts<S: PageSession + ?Sized>(
    session: &mut S,
    selector: &str,
) -> SessionResult<Vec<String>> {
    let elements = session.find_all(selector).await?;
    elements.iter().map(|e| session.text(e)).collect()
}
