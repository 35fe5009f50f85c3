//! Fixed-window rate limiting per client IP.

use crate::server::AppState;
use crate::wrapper::failure;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relwatch_core::config::RateLimitConfig;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

/// Windows are pruned once the map grows past this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// At most `max_requests` per client in each window; the window starts at the
/// client's first request and the counter resets once it has elapsed.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count a request from `client` now.
    pub fn check(&self, client: &str) -> Decision {
        self.check_at(client, Instant::now())
    }

    /// Count a request from `client` at `now`.
    pub fn check_at(&self, client: &str, now: Instant) -> Decision {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            let retry_after = self.window.saturating_sub(now.duration_since(entry.started));
            return Decision::Limited { retry_after };
        }

        entry.count += 1;
        Decision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::MAX_REQUESTS, RateLimitConfig::WINDOW)
    }
}

/// Middleware applied to the `/api` routes.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match state.limiter.check(&client) {
        Decision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(state.limiter.max_requests()));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        Decision::Limited { retry_after } => {
            warn!("Rate limit exceeded for {}", client);
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(failure(RateLimitConfig::EXCEEDED_MESSAGE)),
            )
                .into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after.as_secs().max(1)),
            );
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(limiter.check_at("10.0.0.1", now), Decision::Allowed { remaining: 2 });
        assert_eq!(limiter.check_at("10.0.0.1", now), Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at("10.0.0.1", now), Decision::Allowed { remaining: 0 });
        assert!(matches!(
            limiter.check_at("10.0.0.1", now),
            Decision::Limited { .. }
        ));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(matches!(limiter.check_at("a", now), Decision::Allowed { .. }));
        assert!(matches!(limiter.check_at("a", now), Decision::Limited { .. }));
        assert!(matches!(limiter.check_at("b", now), Decision::Allowed { .. }));
    }

    #[test]
    fn test_window_resets() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(matches!(limiter.check_at("a", start), Decision::Allowed { .. }));

        match limiter.check_at("a", start + Duration::from_secs(20)) {
            Decision::Limited { retry_after } => assert_eq!(retry_after, Duration::from_secs(40)),
            other => panic!("expected limit, got {:?}", other),
        }

        assert!(matches!(
            limiter.check_at("a", start + Duration::from_secs(60)),
            Decision::Allowed { .. }
        ));
    }

    #[test]
    fn test_default_is_sixty_per_minute() {
        let limiter = FixedWindowLimiter::default();
        let now = Instant::now();
        for _ in 0..60 {
            assert!(matches!(limiter.check_at("ip", now), Decision::Allowed { .. }));
        }
        assert!(matches!(limiter.check_at("ip", now), Decision::Limited { .. }));
    }
}
