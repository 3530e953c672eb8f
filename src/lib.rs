//! Agentry: a resumable crawler for a legacy agent-registry portal
//!
//! This crate walks a paginated directory listing, discovers per-row
//! identifiers, fetches each row's detail page through a rotating pool of
//! forwarding endpoints, and accumulates a deduplicated dataset that
//! survives interruption and resumes across runs.

pub mod config;
pub mod crawler;
pub mod pool;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Agentry operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),
}

/// Result type alias for Agentry operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use pool::{ProxyLease, ProxyPool};
pub use state::{AgentRecord, AgentStub, CrawlState, Dataset, ProgressState};
