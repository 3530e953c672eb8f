//! Listing-page scan task
//!
//! One task owns one page number for its whole attempt chain. A blocked or
//! failed attempt rests the borrowed endpoint and retries with a fresh one;
//! the page's in-flight marker is held the entire time, so no second task
//! can be started for the same page while this one is alive.

use crate::crawler::coordinator::{Job, TaskContext};
use crate::crawler::{extract, fetcher};
use crate::crawler::fetcher::FetchOutcome;

/// Scans one listing page until it yields rows
///
/// A listing page carries no recoverable data when blocked, so the retry
/// loop is unbounded; only success or cancellation ends it.
pub(crate) async fn run(ctx: TaskContext, page: u32) {
    let url = format!("{}?Page={}", ctx.config.portal.listing_url, page);

    loop {
        let lease = ctx.pool.acquire().await;
        tracing::debug!("page {}: fetching via {}", page, lease.label());

        let (text, lossy) = match fetcher::fetch_page(&lease, &url, ctx.encoding).await {
            FetchOutcome::Body { text, lossy } => (text, lossy),
            FetchOutcome::Transient { error } => {
                tracing::warn!(
                    "page {}: {}; resting {} and retrying",
                    page,
                    error,
                    lease.label()
                );
                lease.cooldown(ctx.retry_cooldown());
                continue;
            }
        };

        if lossy {
            tracing::warn!("page {}: body decoded lossily", page);
            ctx.state.lock().unwrap().record_decode_error(&url);
        }

        let stubs = extract::listing_stubs(&text);
        if stubs.is_empty() {
            tracing::warn!(
                "page {}: no rows extracted, suspected block; resting {}",
                page,
                lease.label()
            );
            lease.cooldown(ctx.block_cooldown());
            continue;
        }
        lease.release();

        let total = extract::page_total(&text);
        let (new_pages, fresh) = {
            let mut state = ctx.state.lock().unwrap();
            let new_pages = if total > 0 {
                state.learn_total_pages(total)
            } else {
                Vec::new()
            };
            let fresh = state.finish_listing(page, stubs);
            (new_pages, fresh)
        };

        if !new_pages.is_empty() {
            tracing::info!("total pages: {}", total);
        }
        for new_page in new_pages {
            ctx.push(Job::Listing(new_page));
        }
        for stub in fresh {
            ctx.push(Job::Detail(stub));
        }

        tracing::info!("page {} scanned", page);
        return;
    }
}
