use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Listing-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(rename = "session-retry", default)]
    pub session_retry: RetryConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL of the top-level catalog page
    #[serde(rename = "entry-url")]
    pub entry_url: String,

    /// Number of completed frontier nodes between checkpoint flushes
    #[serde(rename = "checkpoint-every", default = "default_checkpoint_every")]
    pub checkpoint_every: usize,

    /// Delay after a detail page appears, letting lazy content settle (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Interval between marker checks while waiting (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl CrawlerConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_checkpoint_every() -> usize {
    5
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Bounded wait budgets, one per level of the site
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wait for the catalog marker on the entry page (seconds)
    #[serde(rename = "catalog-secs")]
    pub catalog_secs: u64,

    /// Wait for the results marker on a group page (seconds)
    #[serde(rename = "group-secs")]
    pub group_secs: u64,

    /// Wait for the detail marker on a leaf page (seconds)
    #[serde(rename = "detail-secs")]
    pub detail_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            catalog_secs: 30,
            group_secs: 30,
            detail_secs: 20,
        }
    }
}

/// What the engine does once session-fault retries run out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExhaustedAction {
    /// Move on to the next frontier node
    Continue,
    /// Stop the run with an error
    Abort,
}

/// Recovery policy applied when the session is lost
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Rebuild-and-retry attempts per frontier node
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Cool-down after re-acquiring the session (milliseconds)
    #[serde(rename = "backoff-ms")]
    pub backoff_ms: u64,

    #[serde(rename = "on-exhausted")]
    pub on_exhausted: ExhaustedAction,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 10_000,
            on_exhausted: ExhaustedAction::Continue,
        }
    }
}

/// CSS selectors describing the structure of the target site
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Container that signals the catalog has loaded
    pub catalog: String,

    /// Links to frontier nodes inside the catalog
    #[serde(rename = "catalog-links")]
    pub catalog_links: String,

    /// Results container on a group page
    pub results: String,

    /// Links to detail pages inside the results container
    #[serde(rename = "child-links")]
    pub child_links: String,

    /// Detail block on a leaf page (beds/baths/sqft text)
    pub detail: String,

    pub price: String,
    pub address: String,
    pub description: String,
    pub features: String,
    pub agent: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            catalog: "div.commlst.clearfix".to_string(),
            catalog_links: "div.commlst.clearfix a".to_string(),
            results: "div.result_box".to_string(),
            child_links: "a.view_details_url".to_string(),
            detail: "div.info_div".to_string(),
            price: "div.price_div".to_string(),
            address: "a[itemprop=\"name\"]".to_string(),
            description: "p.txtblk".to_string(),
            features: "div.features_column".to_string(),
            agent: "#agent_name".to_string(),
        }
    }
}

impl MarkerConfig {
    /// Returns every selector with its key name
    pub fn named(&self) -> [(&'static str, &str); 10] {
        [
            ("catalog", self.catalog.as_str()),
            ("catalog-links", self.catalog_links.as_str()),
            ("results", self.results.as_str()),
            ("child-links", self.child_links.as_str()),
            ("detail", self.detail.as_str()),
            ("price", self.price.as_str()),
            ("address", self.address.as_str()),
            ("description", self.description.as_str()),
            ("features", self.features.as_str()),
            ("agent", self.agent.as_str()),
        ]
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the checkpoint index file
    #[serde(rename = "state-path")]
    pub state_path: String,

    /// Path to the record snapshot CSV
    #[serde(rename = "records-path")]
    pub records_path: String,
}
