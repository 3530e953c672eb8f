//! Detail-page fetch task
//!
//! One task owns one uid for its whole attempt chain; the uid's in-flight
//! marker prevents a second concurrent attempt. Admission control has
//! already short-circuited uids the dataset holds, so reaching this task
//! means a network fetch is genuinely needed.

use crate::crawler::coordinator::TaskContext;
use crate::crawler::fetcher::FetchOutcome;
use crate::crawler::{extract, fetcher};
use crate::state::{AgentRecord, AgentStub};

/// Fetches one row's detail record until it parses
pub(crate) async fn run(ctx: TaskContext, stub: AgentStub) {
    let url = format!("{}?rowid={}", ctx.config.portal.detail_url, stub.uid);

    loop {
        let lease = ctx.pool.acquire().await;
        tracing::debug!("uid {}: fetching via {}", stub.uid, lease.label());

        let (text, lossy) = match fetcher::fetch_page(&lease, &url, ctx.encoding).await {
            FetchOutcome::Body { text, lossy } => (text, lossy),
            FetchOutcome::Transient { error } => {
                tracing::warn!(
                    "uid {}: {}; resting {} and retrying",
                    stub.uid,
                    error,
                    lease.label()
                );
                lease.cooldown(ctx.retry_cooldown());
                continue;
            }
        };

        if lossy {
            tracing::warn!("uid {}: body decoded lossily", stub.uid);
            ctx.state.lock().unwrap().record_decode_error(&url);
        }

        let fields = extract::input_fields(&text);
        if fields.is_empty() {
            tracing::warn!(
                "uid {}: empty detail form, suspected block; resting {}",
                stub.uid,
                lease.label()
            );
            lease.cooldown(ctx.block_cooldown());
            continue;
        }
        lease.release();

        let record = AgentRecord::new(
            stub.uid.clone(),
            extract::decode_entities(&stub.name),
            fields,
        );
        ctx.state.lock().unwrap().finish_detail(record);

        tracing::info!("uid {} recorded", stub.uid);
        return;
    }
}
