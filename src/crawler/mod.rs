//! Crawler module for listing scans and detail fetches
//!
//! This module contains the core crawling logic, including:
//! - Page fetching through pooled endpoints with legacy-encoding decoding
//! - Listing and detail body extraction
//! - Per-page and per-uid retry loops with cooldown backoff
//! - Overall crawl coordination and resumable shutdown

mod coordinator;
mod detail;
mod extract;
mod fetcher;
mod listing;

pub use coordinator::Coordinator;
pub use extract::{decode_entities, input_fields, listing_stubs, page_total};
pub use fetcher::{decode_body, fetch_page, FetchOutcome};

use crate::config::Config;
use crate::CrawlError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for a run. It will:
/// 1. Load persisted progress and the dataset (empty defaults when absent)
/// 2. Seed the proxy pool
/// 3. Scan pending listing pages, expanding to the full page range once the
///    total is learned, and fetch every discovered row's detail record
/// 4. Rewrite both state files, whether the run settled or was cancelled
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Ignore persisted state and start over from page 1
/// * `token` - Cancels the run early; progress made so far is kept
pub async fn crawl(config: Config, fresh: bool, token: CancellationToken) -> Result<(), CrawlError> {
    let mut coordinator = Coordinator::new(config, fresh)?;
    coordinator.run(token).await
}
