//! Crawl coordinator - main orchestration logic
//!
//! The task graph is not a fixed worklist: scanning the page that carries
//! the total page count materializes more listing scans, and every scan can
//! discover rows needing detail fetches. The coordinator therefore drives a
//! job queue that accepts pushes while it is being drained, spawns each
//! admitted job into a `JoinSet`, and is quiescent exactly when the queue is
//! empty and no task remains.
//!
//! Admission happens here, under the one state lock, so a page or uid with
//! an outstanding attempt is never handed to a second task.

use crate::config::Config;
use crate::crawler::{detail, listing};
use crate::pool::ProxyPool;
use crate::state::{AgentStub, CrawlState, Dataset, DetailAdmission, ProgressState};
use crate::{storage, ConfigError, CrawlError};
use encoding_rs::Encoding;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A unit of crawl work
#[derive(Debug)]
pub(crate) enum Job {
    /// Scan one listing page
    Listing(u32),
    /// Fetch one row's detail record
    Detail(AgentStub),
}

/// Everything a spawned task needs, cloned per spawn
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub config: Arc<Config>,
    pub encoding: &'static Encoding,
    pub state: Arc<Mutex<CrawlState>>,
    pub pool: Arc<ProxyPool>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl TaskContext {
    /// Queues follow-up work discovered mid-task
    pub fn push(&self, job: Job) {
        // A closed queue means the run is shutting down; the work is
        // re-derived from persisted state on the next run.
        let _ = self.jobs.send(job);
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.config.crawler.retry_cooldown_secs)
    }

    pub fn block_cooldown(&self) -> Duration {
        Duration::from_secs(self.config.crawler.block_cooldown_secs)
    }
}

/// Main crawl coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    encoding: &'static Encoding,
    state: Arc<Mutex<CrawlState>>,
    pool: Arc<ProxyPool>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Loads both persisted state files (or their empty defaults) and seeds
    /// the proxy pool. A malformed state file fails here, before any network
    /// activity.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Ignore persisted state and start from page 1
    pub fn new(config: Config, fresh: bool) -> Result<Self, CrawlError> {
        let encoding = Encoding::for_label(config.portal.encoding.as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(config.portal.encoding.clone()))?;

        let (progress, dataset) = if fresh {
            tracing::info!("starting fresh, ignoring persisted state");
            (ProgressState::initial(), Dataset::new())
        } else {
            let progress = storage::load_progress(Path::new(&config.output.progress_path))?
                .unwrap_or_else(ProgressState::initial);
            let dataset = storage::load_dataset(Path::new(&config.output.dataset_path))?
                .unwrap_or_default();
            (progress, dataset)
        };

        tracing::info!(
            "starting with {} pending pages, {} pending uids, {} records collected",
            progress.pending_pages.len(),
            progress.pending_uids.len(),
            dataset.len()
        );

        let endpoints: Vec<String> = config.proxy.iter().map(|p| p.endpoint.clone()).collect();
        let pool = ProxyPool::new(
            &endpoints,
            config.crawler.connection_limit,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?;

        Ok(Self {
            config: Arc::new(config),
            encoding,
            state: Arc::new(Mutex::new(CrawlState::new(progress, dataset))),
            pool: Arc::new(pool),
        })
    }

    /// Runs the crawl to quiescence or cancellation
    ///
    /// Both state files are rewritten on every exit path, so an interrupted
    /// run never re-fetches what it already completed and never loses
    /// collected records.
    pub async fn run(&mut self, token: CancellationToken) -> Result<(), CrawlError> {
        let start_time = std::time::Instant::now();

        if let Some(limit) = self.config.crawler.time_limit_secs {
            let deadline = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(limit)).await;
                tracing::info!("time limit reached, stopping");
                deadline.cancel();
            });
        }

        let (jobs_tx, mut jobs_rx) = mpsc::unbounded_channel();
        let ctx = TaskContext {
            config: self.config.clone(),
            encoding: self.encoding,
            state: self.state.clone(),
            pool: self.pool.clone(),
            jobs: jobs_tx,
        };

        // Seed from persisted state: every pending page and every row whose
        // detail record is still missing.
        {
            let state = self.state.lock().unwrap();
            for &page in &state.progress.pending_pages {
                ctx.push(Job::Listing(page));
            }
            for (uid, name) in &state.progress.pending_uids {
                ctx.push(Job::Detail(AgentStub {
                    uid: uid.clone(),
                    name: name.clone(),
                }));
            }
        }

        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            // Anything a finished task queued is visible here, because its
            // sends happened before the join below observed its completion.
            while let Ok(job) = jobs_rx.try_recv() {
                self.admit(job, &ctx, &mut tasks);
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("cancellation requested, abandoning in-flight fetches");
                    tasks.shutdown().await;
                    break;
                }
                joined = tasks.join_next() => {
                    if let Some(Err(e)) = joined {
                        if !e.is_cancelled() {
                            tracing::error!("crawl task failed: {}", e);
                        }
                    }
                }
            }
        }

        self.persist()?;

        let state = self.state.lock().unwrap();
        tracing::info!(
            "run finished in {:?}: {} records collected, {} pages and {} uids left pending",
            start_time.elapsed(),
            state.dataset.len(),
            state.progress.pending_pages.len(),
            state.progress.pending_uids.len()
        );

        Ok(())
    }

    /// Admits one job, spawning a task unless the key is already handled
    fn admit(&self, job: Job, ctx: &TaskContext, tasks: &mut JoinSet<()>) {
        match job {
            Job::Listing(page) => {
                if !self.state.lock().unwrap().admit_listing(page) {
                    tracing::debug!("page {}: already scanned or in flight", page);
                    return;
                }
                let ctx = ctx.clone();
                tasks.spawn(async move { listing::run(ctx, page).await });
            }
            Job::Detail(stub) => match self.state.lock().unwrap().admit_detail(&stub.uid) {
                DetailAdmission::AlreadyRecorded => {
                    tracing::debug!("uid {}: already recorded, skipping", stub.uid);
                }
                DetailAdmission::InFlight => {
                    tracing::debug!("uid {}: attempt already in flight", stub.uid);
                }
                DetailAdmission::Admitted => {
                    let ctx = ctx.clone();
                    tasks.spawn(async move { detail::run(ctx, stub).await });
                }
            },
        }
    }

    /// Rewrites both state files from the current in-memory state
    fn persist(&self) -> Result<(), CrawlError> {
        let state = self.state.lock().unwrap();
        storage::save_progress(
            Path::new(&self.config.output.progress_path),
            &state.progress,
        )?;
        storage::save_dataset(Path::new(&self.config.output.dataset_path), &state.dataset)?;
        tracing::debug!("state files rewritten");
        Ok(())
    }
}
