//! Rate Limiting Middleware
//!
//! Redis-based sliding-window rate limiting for gateway connection
//! attempts, keyed by client IP. REST traffic lives in the CRUD service;
//! the only surface worth limiting here is connection establishment.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

/// Redis key prefix for gateway connection attempts.
const KEY_PREFIX: &str = "rl:gateway";

/// Information about rate limit status returned to clients.
#[derive(Debug, Serialize)]
pub struct RateLimitInfo {
    /// Maximum requests allowed in the current window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp when the rate limit resets
    pub reset_at: i64,
    /// Seconds until the rate limit resets
    pub retry_after: u64,
}

/// Rate limit exceeded error response.
#[derive(Debug, Serialize)]
struct RateLimitExceededResponse {
    #[serde(flatten)]
    error: ErrorResponse,
    rate_limit: RateLimitInfo,
}

/// Redis-based sliding-window rate limiter.
///
/// Uses a sorted set per client where members are unique request markers
/// and scores are Unix timestamps in milliseconds. On each request, entries
/// older than the window are dropped, the remainder counted, and the
/// request admitted only under the limit. The whole check runs as one Lua
/// script so concurrent connection attempts cannot race the count.
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    config: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager, config: RateLimitSettings) -> Self {
        Self { redis, config }
    }

    /// Check if a request should be allowed.
    ///
    /// Returns `Ok(RateLimitInfo)` if allowed, `Err(RateLimitInfo)` if rate
    /// limited.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        let key = format!("{}:{}", KEY_PREFIX, identifier);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_ms = (self.config.window_seconds * 1000) as i64;
        let window_start = now_ms - window_ms;
        let max_requests = self.config.requests_per_window + self.config.burst_allowance;

        let mut conn = self.redis.clone();

        let script = redis::Script::new(
            r#"
            local key = KEYS[1]
            local now_ms = tonumber(ARGV[1])
            local window_start = tonumber(ARGV[2])
            local max_requests = tonumber(ARGV[3])
            local window_seconds = tonumber(ARGV[4])

            -- Remove entries outside the window
            redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)

            -- Count current entries
            local current_count = redis.call('ZCARD', key)

            if current_count < max_requests then
                local member = now_ms .. ':' .. math.random(1000000)
                redis.call('ZADD', key, now_ms, member)
                redis.call('EXPIRE', key, window_seconds + 1)
                return {1, current_count + 1, max_requests, 0}
            else
                local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
                local retry_after = 0
                if oldest and #oldest >= 2 then
                    retry_after = oldest[2] + (window_seconds * 1000) - now_ms
                end
                return {0, current_count, max_requests, retry_after}
            end
            "#,
        );

        let result: Vec<i64> = script
            .key(&key)
            .arg(now_ms)
            .arg(window_start)
            .arg(max_requests as i64)
            .arg(self.config.window_seconds as i64)
            .invoke_async(&mut conn)
            .await
            .unwrap_or_else(|e| {
                // A Redis outage must not take the gateway down with it;
                // admit the request and rely on the logs.
                tracing::error!("Rate limiter Redis error: {}", e);
                vec![1, 0, max_requests as i64, 0]
            });

        let allowed = result.first().copied().unwrap_or(1) == 1;
        let current_count = result.get(1).copied().unwrap_or(0) as u32;
        let retry_after_ms = result.get(3).copied().unwrap_or(0).max(0) as u64;

        let info = RateLimitInfo {
            limit: max_requests,
            remaining: max_requests.saturating_sub(current_count),
            reset_at: (now_ms / 1000) + self.config.window_seconds as i64,
            retry_after: retry_after_ms.div_ceil(1000),
        };

        if allowed {
            Ok(info)
        } else {
            Err(info)
        }
    }
}

/// Rate limit middleware for the gateway upgrade route.
pub async fn rate_limit_gateway(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let limiter = RateLimiter::new(state.redis.clone(), state.settings.rate_limit.clone());

    match limiter.check(&addr.ip().to_string()).await {
        Ok(_) => next.run(request).await,
        Err(info) => {
            tracing::warn!(client = %addr.ip(), "Gateway connection rate limited");
            let retry_after = info.retry_after.to_string();
            let body = RateLimitExceededResponse {
                error: ErrorResponse {
                    code: 10006,
                    message: "Too many connection attempts".into(),
                },
                rate_limit: info,
            };
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after)],
                Json(body),
            )
                .into_response()
        }
    }
}
