use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use dashmap::DashMap;

use crate::error::AppError;
use crate::extractors::client_ip::client_ip;
use crate::state::AppState;

/// Fixed-window request counter keyed by client IP.
///
/// Windows are aligned to multiples of `window_secs` since the epoch, so all
/// clients roll over at the same instant. State lives in-process; a
/// multi-instance deployment rate-limits per instance.
pub struct FixedWindowLimiter {
    window_secs: u64,
    max_requests: u64,
    windows: DashMap<String, Window>,
}

struct Window {
    id: u64,
    count: u64,
}

/// Remaining budget reported via the standard RateLimit response headers.
pub struct Quota {
    pub limit: u64,
    pub remaining: u64,
    pub reset_secs: u64,
}

impl FixedWindowLimiter {
    pub fn new(window_secs: u64, max_requests: u64) -> Self {
        Self {
            window_secs: window_secs.max(1),
            max_requests,
            windows: DashMap::new(),
        }
    }

    /// Count a request for `key` now; `Err` carries seconds until the window resets.
    pub fn check(&self, key: &str) -> Result<Quota, u64> {
        self.check_at(key, Utc::now().timestamp().max(0) as u64)
    }

    fn current_window(&self, now_secs: u64) -> (u64, u64) {
        let id = now_secs / self.window_secs;
        let reset_secs = self.window_secs - (now_secs % self.window_secs);
        (id, reset_secs)
    }

    pub fn check_at(&self, key: &str, now_secs: u64) -> Result<Quota, u64> {
        let (window_id, reset_secs) = self.current_window(now_secs);

        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { id: window_id, count: 0 });

        if entry.id != window_id {
            entry.id = window_id;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return Err(reset_secs);
        }
        entry.count += 1;

        let quota = Quota {
            limit: self.max_requests,
            remaining: self.max_requests - entry.count,
            reset_secs,
        };
        drop(entry);

        // Stale keys only accumulate between windows; prune once the map is
        // clearly dominated by them.
        if self.windows.len() > 100_000 {
            self.windows.retain(|_, w| w.id == window_id);
        }

        Ok(quota)
    }
}

fn numeric_header(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).expect("numeric header value")
}

fn apply_quota_headers(headers: &mut HeaderMap, limit: u64, remaining: u64, reset_secs: u64) {
    headers.insert("RateLimit-Limit", numeric_header(limit));
    headers.insert("RateLimit-Remaining", numeric_header(remaining));
    headers.insert("RateLimit-Reset", numeric_header(reset_secs));
}

/// Per-IP fixed-window rate limiting, applied to every route.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(req.headers(), req.extensions());

    match state.rate_limiter.check(&ip) {
        Ok(quota) => {
            let mut response = next.run(req).await;
            apply_quota_headers(
                response.headers_mut(),
                quota.limit,
                quota.remaining,
                quota.reset_secs,
            );
            response
        }
        Err(retry_after) => {
            let mut response = AppError::RateLimited { retry_after }.into_response();
            apply_quota_headers(
                response.headers_mut(),
                state.rate_limiter.max_requests,
                0,
                retry_after,
            );
            response
        }
    }
}
