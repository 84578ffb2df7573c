//! In-memory listing site and session for crawler tests
//!
//! Pages are lists of `(selector, element)` pairs; a selector "matches" when
//! it is string-equal to one stored on the page. Faults are scripted per URL.

use crate::checkpoint::{CheckpointError, CheckpointResult, CheckpointStore};
use crate::config::{parse_config, Config, MarkerConfig};
use crate::record::Record;
use crate::session::{ElementHandle, PageSession, SessionError, SessionFactory, SessionResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ENTRY_URL: &str = "https://listings.test/catalog";

pub fn node_url(index: usize) -> String {
    format!("https://listings.test/community/{}", index)
}

pub fn leaf_url(node: usize, child: usize) -> String {
    format!("https://listings.test/listing/{}-{}", node, child)
}

/// Configuration with every delay set to zero
pub fn test_config() -> Config {
    let toml = format!(
        r#"
[crawler]
entry-url = "{}"
checkpoint-every = 5
settle-delay-ms = 0
poll-interval-ms = 1

[timeouts]
catalog-secs = 1
group-secs = 1
detail-secs = 1

[session-retry]
max-attempts = 1
backoff-ms = 0
on-exhausted = "continue"

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
state-path = "last_state.txt"
records-path = "listings.csv"
"#,
        ENTRY_URL
    );
    parse_config(&toml).unwrap()
}

#[derive(Debug, Clone)]
struct FakeElement {
    selector: String,
    text: String,
    href: Option<String>,
}

/// A scripted page
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: Vec<FakeElement>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, selector: &str, text: &str) -> Self {
        self.elements.push(FakeElement {
            selector: selector.to_string(),
            text: text.to_string(),
            href: None,
        });
        self
    }

    pub fn link(mut self, selector: &str, href: &str) -> Self {
        self.elements.push(FakeElement {
            selector: selector.to_string(),
            text: String::new(),
            href: Some(href.to_string()),
        });
        self
    }

    /// A complete detail page without description or agent blocks
    pub fn leaf(address: &str) -> Self {
        let m = MarkerConfig::default();
        Self::new()
            .element(&m.detail, "3 Beds 2 Baths 1,200 ft²")
            .element(&m.price, "$100,000")
            .element(&m.address, address)
            .element(&m.features, "Pool")
            .element(&m.features, "Gated")
    }

    fn has(&self, selector: &str) -> bool {
        self.elements.iter().any(|e| e.selector == selector)
    }
}

#[derive(Debug, Default)]
struct SiteState {
    pages: HashMap<String, FakePage>,
    visits: Vec<String>,
    acquires: usize,
    unavailable: bool,
    crash_on_navigate: HashMap<String, usize>,
    crash_on_back: HashMap<String, usize>,
    broken_back: HashMap<String, usize>,
    stale: HashSet<(String, usize)>,
    sessions: Vec<Arc<Mutex<bool>>>,
}

/// A site shared by every session the factory hands out
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    state: Arc<Mutex<SiteState>>,
}

/// Catalog with `nodes` frontier nodes, each listing `children` leaves
pub fn listing_site(nodes: usize, children: usize) -> FakeSite {
    let m = MarkerConfig::default();
    let site = FakeSite::default();

    let mut catalog = FakePage::new().element(&m.catalog, "");
    for i in 0..nodes {
        catalog = catalog.link(&m.catalog_links, &node_url(i));

        let mut group = FakePage::new().element(&m.results, "");
        for k in 0..children {
            group = group.link(&m.child_links, &leaf_url(i, k));
            site.add_page(&leaf_url(i, k), FakePage::leaf(&format!("{}-{} Main St", i, k)));
        }
        site.add_page(&node_url(i), group);
    }
    site.add_page(ENTRY_URL, catalog);

    site
}

impl FakeSite {
    fn lock(&self) -> std::sync::MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    pub fn add_page(&self, url: &str, page: FakePage) {
        self.lock().pages.insert(url.to_string(), page);
    }

    pub fn remove_page(&self, url: &str) {
        self.lock().pages.remove(url);
    }

    /// The next `times` navigations to `url` crash the session
    pub fn crash_on_navigate(&self, url: &str, times: usize) {
        self.lock().crash_on_navigate.insert(url.to_string(), times);
    }

    /// The next `times` back-navigations away from `url` crash the session
    pub fn crash_on_back_from(&self, url: &str, times: usize) {
        self.lock().crash_on_back.insert(url.to_string(), times);
    }

    /// The next `times` back-navigations away from `url` fail without
    /// losing the session
    pub fn break_back_from(&self, url: &str, times: usize) {
        self.lock().broken_back.insert(url.to_string(), times);
    }

    /// Child link `position` on `page_url` is always stale when read
    pub fn stale_child(&self, page_url: &str, position: usize) {
        self.lock().stale.insert((page_url.to_string(), position));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Navigation attempts to `url`, crashed ones included
    pub fn visits_to(&self, url: &str) -> usize {
        self.lock().visits.iter().filter(|v| *v == url).count()
    }

    pub fn acquires(&self) -> usize {
        self.lock().acquires
    }

    pub fn all_sessions_closed(&self) -> bool {
        self.lock().sessions.iter().all(|s| *s.lock().unwrap())
    }

    pub fn factory(&self) -> FakeFactory {
        FakeFactory { site: self.clone() }
    }

    fn take_crash(counts: &mut HashMap<String, usize>, url: &str) -> bool {
        match counts.get_mut(url) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

pub struct FakeFactory {
    site: FakeSite,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    async fn acquire(&self) -> SessionResult<FakeSession> {
        let mut state = self.site.lock();
        if state.unavailable {
            return Err(SessionError::Unavailable("no browser".to_string()));
        }
        state.acquires += 1;

        let closed = Arc::new(Mutex::new(false));
        state.sessions.push(closed.clone());

        Ok(FakeSession {
            site: self.site.clone(),
            history: Vec::new(),
            generation: 0,
            crashed: false,
            closed,
        })
    }
}

pub struct FakeSession {
    site: FakeSite,
    history: Vec<String>,
    generation: u64,
    crashed: bool,
    closed: Arc<Mutex<bool>>,
}

impl FakeSession {
    fn check_alive(&self) -> SessionResult<()> {
        if *self.closed.lock().unwrap() {
            return Err(SessionError::Closed);
        }
        if self.crashed {
            return Err(SessionError::Lost("browser crashed".to_string()));
        }
        Ok(())
    }

    fn current_page(&self) -> Option<FakePage> {
        let url = self.history.last()?;
        self.site.lock().pages.get(url).cloned()
    }

    fn crash(&mut self) -> SessionError {
        self.crashed = true;
        SessionError::Lost("browser crashed".to_string())
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.check_alive()?;

        let (crash, exists) = {
            let mut state = self.site.lock();
            state.visits.push(url.to_string());
            let crash = FakeSite::take_crash(&mut state.crash_on_navigate, url);
            (crash, state.pages.contains_key(url))
        };
        if crash {
            return Err(self.crash());
        }

        self.history.push(url.to_string());
        self.generation += 1;

        if exists {
            Ok(())
        } else {
            Err(SessionError::Navigation {
                url: url.to_string(),
                message: "HTTP 404".to_string(),
            })
        }
    }

    async fn wait_for_marker(&mut self, marker: &str, timeout: Duration) -> SessionResult<()> {
        self.check_alive()?;
        match self.current_page() {
            Some(page) if page.has(marker) => Ok(()),
            _ => Err(SessionError::Timeout {
                marker: marker.to_string(),
                timeout,
            }),
        }
    }

    async fn find_all(&mut self, selector: &str) -> SessionResult<Vec<ElementHandle>> {
        self.check_alive()?;
        let Some(page) = self.current_page() else {
            return Ok(Vec::new());
        };
        let url = self.history.last().cloned().unwrap_or_default();
        let stale = self.site.lock().stale.clone();

        let handles = page
            .elements
            .iter()
            .filter(|e| e.selector == selector)
            .enumerate()
            .map(|(position, e)| {
                let generation = if stale.contains(&(url.clone(), position)) {
                    u64::MAX
                } else {
                    self.generation
                };
                let mut attributes = HashMap::new();
                if let Some(href) = &e.href {
                    attributes.insert("href".to_string(), href.clone());
                }
                ElementHandle::new(generation, position, e.text.clone(), attributes)
            })
            .collect();
        Ok(handles)
    }

    async fn back(&mut self) -> SessionResult<()> {
        self.check_alive()?;

        let current = self.history.last().cloned().unwrap_or_default();
        let crash = FakeSite::take_crash(&mut self.site.lock().crash_on_back, &current);
        if crash {
            return Err(self.crash());
        }
        let broken = FakeSite::take_crash(&mut self.site.lock().broken_back, &current);
        if broken {
            return Err(SessionError::Navigation {
                url: current,
                message: "history entry unavailable".to_string(),
            });
        }

        if self.history.len() < 2 {
            return Err(SessionError::Navigation {
                url: current,
                message: "no previous page".to_string(),
            });
        }
        self.history.pop();
        self.generation += 1;
        Ok(())
    }

    async fn quit(&mut self) -> SessionResult<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

/// Checkpoint store that remembers every successful flush
#[derive(Debug, Default)]
pub struct RecordingStore {
    resume_index: usize,
    flushes: Vec<(usize, Vec<Record>)>,
    fail_at: Option<usize>,
}

impl RecordingStore {
    pub fn new(resume_index: usize) -> Self {
        Self {
            resume_index,
            ..Self::default()
        }
    }

    /// Flushes at `index` fail with an I/O error
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn flushes(&self) -> &[(usize, Vec<Record>)] {
        &self.flushes
    }
}

impl CheckpointStore for RecordingStore {
    fn load_resume_index(&self) -> CheckpointResult<usize> {
        Ok(self.resume_index)
    }

    fn flush(&mut self, index: usize, records: &[Record]) -> CheckpointResult<()> {
        if self.fail_at == Some(index) {
            return Err(CheckpointError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.flushes.push((index, records.to_vec()));
        Ok(())
    }

    fn clear(&mut self) -> CheckpointResult<()> {
        self.resume_index = 0;
        self.flushes.clear();
        Ok(())
    }
}
