//! Per-client fixed-window rate limiting.

use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use crate::ApiError;

/// Default request budget per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 1000;
/// Default window length (15 minutes).
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Path prefix the limiter applies to.
pub const LIMITED_PREFIX: &str = "/api";

/// Windows are pruned once this many clients are tracked.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-memory rate limiter keyed by client IP.
///
/// Requests without a known peer address share one bucket.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<Option<IpAddr>, Window>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window` and client.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request from `client`.
    ///
    /// # Errors
    /// Returns the number of seconds until the window resets when the
    /// budget is exhausted.
    pub async fn check(&self, client: Option<IpAddr>) -> Result<(), u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() >= PRUNE_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let window = windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.duration_since(window.started);
        if elapsed >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            let remaining = self.window.saturating_sub(elapsed);
            return Err(remaining.as_secs().max(1));
        }

        window.count += 1;
        Ok(())
    }
}

/// Axum middleware enforcing a [`RateLimiter`] on every request under
/// [`LIMITED_PREFIX`], matched or not.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !is_limited(request.uri().path()) {
        return next.run(request).await;
    }

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match limiter.check(client).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(client = ?client, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }.into_response()
        }
    }
}

fn is_limited(path: &str) -> bool {
    path.strip_prefix(LIMITED_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
