//! Per-client fixed-window rate limiting.
//!
//! # Responsibilities
//! - Count admitted requests per client identity within a window
//! - Reject with 429 once the ceiling is reached
//! - Optionally give back units consumed by successful responses
//! - Evict counters of clients that went quiet
//!
//! # Design Decisions
//! - Counters live in a sharded map; the entry lock serializes each
//!   client's read-modify-write so concurrent requests never over-admit
//! - A rejected request consumes nothing: `count` is the number of
//!   admitted, unrefunded requests in the current window
//! - Time comes from `tokio::time::Instant` so tests can pause the clock

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::client::ClientIdentity;
use crate::security::rejection::{
    whole_secs, Rejection, RATELIMIT_LIMIT, RATELIMIT_REMAINING, RATELIMIT_RESET,
};

/// Window state for one client.
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    window_start: Instant,
    count: u32,
}

/// Receipt for an admitted request, needed to refund it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub window_start: Instant,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl Admission {
    /// Write the `RateLimit-*` headers describing this admission.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATELIMIT_RESET, HeaderValue::from(whole_secs(self.reset_after)));
    }
}

/// Shared rate limiter state.
pub struct RateLimiter {
    counters: DashMap<ClientIdentity, WindowCounter>,
    window: Duration,
    max_requests: u32,
    skip_successful: bool,
    trust_forwarded_for: bool,
    stale_after: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window = config.window();
        Self {
            counters: DashMap::new(),
            window,
            max_requests: config.max_requests,
            skip_successful: config.skip_successful,
            trust_forwarded_for: config.trust_forwarded_for,
            stale_after: window.saturating_mul(config.stale_after_windows.max(1)),
        }
    }

    /// Identity used to account `request`.
    pub fn identify<B>(&self, request: &axum::http::Request<B>) -> ClientIdentity {
        ClientIdentity::from_request(request, self.trust_forwarded_for).unwrap_or_else(|| {
            tracing::debug!("No peer address on request, using shared bucket");
            ClientIdentity::UNKNOWN
        })
    }

    /// Count one request for `client` against the current window.
    pub fn check(&self, client: ClientIdentity) -> Result<Admission, Rejection> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: ClientIdentity, now: Instant) -> Result<Admission, Rejection> {
        let mut entry = self.counters.entry(client).or_insert(WindowCounter {
            window_start: now,
            count: 0,
        });
        let counter = entry.value_mut();

        // A stale window is replaced, never continued.
        if now.duration_since(counter.window_start) >= self.window {
            *counter = WindowCounter {
                window_start: now,
                count: 0,
            };
        }

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(counter.window_start));

        if counter.count >= self.max_requests {
            return Err(Rejection::RateLimitExceeded {
                retry_after: reset_after,
                limit: self.max_requests,
            });
        }

        counter.count += 1;
        Ok(Admission {
            window_start: counter.window_start,
            limit: self.max_requests,
            remaining: self.max_requests - counter.count,
            reset_after,
        })
    }

    /// Settle an admitted request once its response status is known.
    ///
    /// With `skip_successful`, a status below 400 returns the unit to the
    /// window that admitted it. Refunds for a window that already rolled
    /// over are dropped.
    pub fn complete(&self, client: ClientIdentity, admission: &Admission, status: u16) {
        if !self.skip_successful || status >= 400 {
            return;
        }
        if let Some(mut counter) = self.counters.get_mut(&client) {
            if counter.window_start == admission.window_start {
                counter.count = counter.count.saturating_sub(1);
            }
        }
    }

    /// Drop counters whose window started more than `stale_after` ago.
    pub fn purge_stale(&self) -> usize {
        self.purge_stale_at(Instant::now())
    }

    fn purge_stale_at(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters
            .retain(|_, counter| now.duration_since(counter.window_start) < self.stale_after);
        before.saturating_sub(self.counters.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.counters.len()
    }

    /// Periodically purge stale counters until shutdown.
    pub fn spawn_janitor(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let period = self.window.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = self.purge_stale();
                        let tracked = self.tracked_clients();
                        metrics::record_tracked_clients(tracked);
                        if purged > 0 {
                            tracing::debug!(purged, tracked, "Evicted idle rate-limit counters");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate-limit janitor stopping");
                        break;
                    }
                }
            }
        })
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = limiter.identify(&request);

    match limiter.check(client) {
        Ok(admission) => {
            let mut response = next.run(request).await;
            limiter.complete(client, &admission, response.status().as_u16());
            admission.write_headers(response.headers_mut());
            response
        }
        Err(rejection) => {
            let retry_after_secs = match &rejection {
                Rejection::RateLimitExceeded { retry_after, .. } => whole_secs(*retry_after),
                _ => 0,
            };
            tracing::warn!(
                client = %client,
                path = %request.uri().path(),
                retry_after_secs,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
            rejection.into_response()
        }
    }
}
