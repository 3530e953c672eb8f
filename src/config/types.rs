use serde::Deserialize;

/// Main configuration structure for Agentry
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub portal: PortalConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub proxy: Vec<ProxyEntry>,
    pub output: OutputConfig,
}

/// Target portal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the paginated listing (the page number is appended as `?Page=<n>`)
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Base URL of the per-row detail page (the row id is appended as `?rowid=<uid>`)
    #[serde(rename = "detail-url")]
    pub detail_url: String,

    /// Legacy byte encoding the portal serves its pages in (a WHATWG label)
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Concurrent borrows allowed per forwarding endpoint
    #[serde(rename = "connection-limit")]
    pub connection_limit: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Endpoint rest period after a transient network failure (seconds)
    #[serde(rename = "retry-cooldown-secs")]
    pub retry_cooldown_secs: u64,

    /// Endpoint rest period after a suspected block (seconds)
    #[serde(rename = "block-cooldown-secs")]
    pub block_cooldown_secs: u64,

    /// Optional wall-clock limit for the whole run (seconds)
    #[serde(rename = "time-limit-secs")]
    pub time_limit_secs: Option<u64>,
}

/// One forwarding endpoint the pool rotates through
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyEntry {
    /// Endpoint URL, e.g. "http://10.0.0.1:8080"
    pub endpoint: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the progress file (pending pages/uids and the decode-error log)
    #[serde(rename = "progress-path")]
    pub progress_path: String,

    /// Path to the dataset file (collected records)
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,
}

fn default_encoding() -> String {
    "big5".to_string()
}
