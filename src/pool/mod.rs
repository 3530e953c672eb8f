//! Proxy pool with exclusive checkout and cooldown re-admission
//!
//! The pool owns every forwarding endpoint plus a "direct, no forwarding"
//! sentinel. A fetch borrows exactly one slot at a time; when the pool is
//! empty the caller suspends until a slot is released or a cooldown deadline
//! elapses. Waiters are served in whatever order the checkout lock admits
//! them - no fairness guarantee.
//!
//! Every endpoint is seeded `connection-limit` times, so the implicit
//! concurrency ceiling is connection-limit x (endpoints + 1) while each slot
//! is still exclusively held by one request.

use reqwest::Client;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// One borrowable slot: an endpoint and its prebuilt HTTP client
#[derive(Debug)]
pub struct Proxy {
    /// Forwarding endpoint URL; None means a direct connection
    endpoint: Option<String>,
    client: Client,
}

impl Proxy {
    /// Human-readable label for log lines
    pub fn label(&self) -> &str {
        self.endpoint.as_deref().unwrap_or("direct")
    }
}

/// Pool of proxy slots available for checkout
pub struct ProxyPool {
    readmit: mpsc::UnboundedSender<Proxy>,
    checkout: Mutex<mpsc::UnboundedReceiver<Proxy>>,
}

impl ProxyPool {
    /// Builds the pool from the configured endpoint list
    ///
    /// Each endpoint - and the direct sentinel - gets `connection_limit`
    /// interchangeable slots sharing one client.
    ///
    /// # Arguments
    ///
    /// * `endpoints` - Forwarding endpoint URLs
    /// * `connection_limit` - Slots seeded per endpoint
    /// * `timeout` - Per-request timeout applied to every client
    ///
    /// # Returns
    ///
    /// * `Ok(ProxyPool)` - Pool seeded and ready
    /// * `Err(reqwest::Error)` - A client could not be built (e.g. bad endpoint URL)
    pub fn new(
        endpoints: &[String],
        connection_limit: u32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let (readmit, checkout) = mpsc::unbounded_channel();

        let direct = build_client(None, timeout)?;
        for _ in 0..connection_limit {
            let _ = readmit.send(Proxy {
                endpoint: None,
                client: direct.clone(),
            });
        }

        for endpoint in endpoints {
            let client = build_client(Some(endpoint), timeout)?;
            for _ in 0..connection_limit {
                let _ = readmit.send(Proxy {
                    endpoint: Some(endpoint.clone()),
                    client: client.clone(),
                });
            }
        }

        Ok(Self {
            readmit,
            checkout: Mutex::new(checkout),
        })
    }

    /// Checks out one slot, suspending until one is available
    pub async fn acquire(&self) -> ProxyLease {
        let mut checkout = self.checkout.lock().await;
        // The pool itself holds a sender, so the channel can never close.
        let proxy = checkout
            .recv()
            .await
            .expect("pool re-admission channel closed");

        ProxyLease {
            proxy: Some(proxy),
            readmit: self.readmit.clone(),
        }
    }
}

/// Exclusive borrow of one proxy slot
///
/// The slot returns to the pool exactly once: via [`release`](Self::release),
/// via [`cooldown`](Self::cooldown), or - if the holder unwinds or is
/// aborted before deciding - on drop.
pub struct ProxyLease {
    proxy: Option<Proxy>,
    readmit: mpsc::UnboundedSender<Proxy>,
}

impl ProxyLease {
    /// The HTTP client routed through this slot's endpoint
    pub fn client(&self) -> &Client {
        &self.borrowed().client
    }

    /// Log label of the borrowed endpoint
    pub fn label(&self) -> &str {
        self.borrowed().label()
    }

    /// Returns the slot to the pool immediately
    pub fn release(mut self) {
        if let Some(proxy) = self.proxy.take() {
            let _ = self.readmit.send(proxy);
        }
    }

    /// Schedules the slot for re-admission after `delay` elapses
    ///
    /// Used when the endpoint looked blocked and should rest before the
    /// next borrow.
    pub fn cooldown(mut self, delay: Duration) {
        if let Some(proxy) = self.proxy.take() {
            let readmit = self.readmit.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::debug!("endpoint {} rested, re-admitting", proxy.label());
                let _ = readmit.send(proxy);
            });
        }
    }

    fn borrowed(&self) -> &Proxy {
        // release/cooldown consume the lease, so a live lease always holds.
        self.proxy.as_ref().expect("lease already consumed")
    }
}

impl Drop for ProxyLease {
    fn drop(&mut self) {
        if let Some(proxy) = self.proxy.take() {
            let _ = self.readmit.send(proxy);
        }
    }
}

/// Builds one HTTP client, optionally routed through a forwarding endpoint
fn build_client(endpoint: Option<&str>, timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true);

    if let Some(endpoint) = endpoint {
        builder = builder.proxy(reqwest::Proxy::all(endpoint)?);
    }

    builder.build()
}
