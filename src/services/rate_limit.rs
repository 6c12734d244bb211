use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Fixed-window rate limiting for a single-instance deployment. Counters
/// live in process memory; a multi-instance deployment would need a shared
/// backend instead.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Login attempts: 10 per minute.
    pub const AUTH: Self = Self {
        limit: 10,
        window_secs: 60,
    };

    /// Bulk export forwarding: 20 per minute.
    pub const EXPORT: Self = Self {
        limit: 20,
        window_secs: 60,
    };

    /// General API traffic, configured per environment.
    pub fn api(config: &ApiConfig) -> Self {
        Self {
            limit: config.rate_limit_requests,
            window_secs: config.rate_limit_window_secs,
        }
    }
}

struct WindowEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Outcome of one rate-limit check, carrying what the 429 headers need.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitOutcome {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Per-identifier windowed counters behind one async lock. The map is swept
/// of expired windows once it grows past `MAX_ENTRIES`.
#[derive(Default)]
pub struct RateLimiter {
    entries: Mutex<HashMap<String, WindowEntry>>,
}

const MAX_ENTRIES: usize = 10_000;

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn check(&self, identifier: &str, config: RateLimitConfig) -> RateLimitOutcome {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;

        if entries.len() > MAX_ENTRIES {
            entries.retain(|_, entry| entry.reset_at > now);
        }

        match entries.get_mut(identifier) {
            Some(entry) if entry.reset_at > now => {
                if entry.count >= config.limit {
                    return RateLimitOutcome {
                        allowed: false,
                        limit: config.limit,
                        remaining: 0,
                        reset_at: entry.reset_at,
                    };
                }
                entry.count += 1;
                RateLimitOutcome {
                    allowed: true,
                    limit: config.limit,
                    remaining: config.limit - entry.count,
                    reset_at: entry.reset_at,
                }
            }
            _ => {
                // New window (or a stale one being replaced)
                let reset_at = now + Duration::seconds(config.window_secs as i64);
                entries.insert(
                    identifier.to_string(),
                    WindowEntry { count: 1, reset_at },
                );
                RateLimitOutcome {
                    allowed: true,
                    limit: config.limit,
                    remaining: config.limit.saturating_sub(1),
                    reset_at,
                }
            }
        }
    }
}

/// Client identifier for rate limiting: first `x-forwarded-for` hop, then
/// `x-real-ip`, then a shared bucket.
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn numeric_header(value: i64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// 429 envelope with the standard rate-limit headers attached.
pub fn limited_response(outcome: &RateLimitOutcome) -> Response {
    let retry_after = (outcome.reset_at - Utc::now()).num_seconds().max(0) + 1;
    let mut response =
        ApiError::too_many_requests("Too many requests. Please try again later.").into_response();
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", numeric_header(outcome.limit as i64));
    headers.insert("X-RateLimit-Remaining", numeric_header(0));
    headers.insert("X-RateLimit-Reset", numeric_header(outcome.reset_at.timestamp()));
    headers.insert("Retry-After", numeric_header(retry_after));
    response
}

/// Middleware over `/api/*`: enforces the configured general-API limit when
/// enabled. Login and export carry their own stricter presets.
pub async fn api_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.api.enable_rate_limiting {
        return next.run(request).await;
    }

    let identifier = client_identifier(request.headers());
    let outcome = state
        .rate_limiter
        .check(&identifier, RateLimitConfig::api(&state.config.api))
        .await;

    if !outcome.allowed {
        tracing::warn!(client = %identifier, "api rate limit exceeded");
        return limited_response(&outcome);
    }

    next.run(request).await
}
