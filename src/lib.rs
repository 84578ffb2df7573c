//! Listing-Harvester: a resumable three-level listing crawler
//!
//! This crate walks a hierarchical listing site (catalog → group pages →
//! detail pages), extracts one [`Record`] per detail page, and checkpoints its
//! progress so an interrupted run can pick up where it left off.

pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod session;
pub mod state;

use thiserror::Error;

/// Main error type for Listing-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Unrecoverable fault: {0}")]
    Fault(#[from] crawler::Fault),

    #[error("Session retries exhausted while processing frontier node {index}")]
    RetriesExhausted { index: usize },

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector for marker '{name}': {selector}")]
    InvalidSelector { name: String, selector: String },
}

/// Result type alias for Listing-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use checkpoint::{CheckpointStore, FileCheckpointStore};
pub use config::Config;
pub use crawler::{CrawlEngine, Fault, FaultScope, RetryPolicy};
pub use record::Record;
pub use session::{ElementHandle, PageSession, SessionError, SessionFactory};
pub use state::CrawlPhase;
