//! Token bucket rate limiter middleware, keyed by client IP.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use abdullahhub_core::config::{RateLimitConfig, RateLimitRule};
use abdullahhub_core::error::AppError;

use crate::error::ApiError;
use crate::extractors::client_ip::client_ip;

/// Message returned with every 429.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// In-memory token bucket rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Client key → bucket state.
    buckets: Arc<DashMap<String, TokenBucket>>,
    /// Maximum tokens per bucket.
    max_tokens: f64,
    /// Token refill rate per second.
    refill_rate: f64,
    /// When false every request passes.
    enabled: bool,
}

#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Creates a new rate limiter.
    pub fn new(rule: RateLimitRule, enabled: bool) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            max_tokens: f64::from(rule.requests.max(1)),
            refill_rate: rule.refill_rate(),
            enabled,
        }
    }

    /// Consume a token for `key`, or return how long until one is available.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        if !self.enabled {
            return Ok(());
        }
        let now = Instant::now();
        let mut bucket = self.buckets.entry(key.to_string()).or_insert(TokenBucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - bucket.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_rate.max(f64::EPSILON)))
        }
    }

    /// Give back a token taken by [`RateLimiter::check`].
    pub fn refund(&self, key: &str) {
        if !self.enabled {
            return;
        }
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            bucket.tokens = (bucket.tokens + 1.0).min(self.max_tokens);
        }
    }

    /// Drop buckets that have refilled completely.
    pub fn prune(&self) {
        let now = Instant::now();
        self.buckets.retain(|_, bucket| {
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens + elapsed * self.refill_rate < self.max_tokens
        });
    }

    /// Number of tracked clients.
    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }
}

/// One limiter per rule in [`RateLimitConfig`].
#[derive(Debug, Clone)]
pub struct RateLimits {
    /// Default hourly limit.
    pub hourly: RateLimiter,
    /// Default daily limit.
    pub daily: RateLimiter,
    /// Plugin installation.
    pub install: RateLimiter,
    /// Plugin execution by users.
    pub execute: RateLimiter,
    /// Public plugin listing.
    pub public_list: RateLimiter,
    /// Public execution with an API key.
    pub public_execute: RateLimiter,
}

impl RateLimits {
    /// Build all limiters from configuration.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let on = config.enabled;
        Self {
            hourly: RateLimiter::new(config.default_hourly, on),
            daily: RateLimiter::new(config.default_daily, on),
            install: RateLimiter::new(config.install, on),
            execute: RateLimiter::new(config.execute, on),
            public_list: RateLimiter::new(config.public_list, on),
            public_execute: RateLimiter::new(config.public_execute, on),
        }
    }

    /// Spend one request against both default limits. A request refused by
    /// the daily limit does not count against the hourly one.
    pub fn check_default(&self, key: &str) -> Result<(), Duration> {
        self.hourly.check(key)?;
        if let Err(retry_after) = self.daily.check(key) {
            self.hourly.refund(key);
            return Err(retry_after);
        }
        Ok(())
    }

    /// Prune every limiter.
    pub fn prune(&self) {
        for limiter in [
            &self.hourly,
            &self.daily,
            &self.install,
            &self.execute,
            &self.public_list,
            &self.public_execute,
        ] {
            limiter.prune();
        }
    }
}

fn too_many_requests(retry_after: Duration) -> Response {
    let mut response = ApiError(AppError::rate_limited(RATE_LIMIT_MESSAGE)).into_response();
    let secs = retry_after.as_secs().max(1);
    if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

/// Enforce a single route-specific limiter.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_ip(request.headers(), request.extensions());
    match limiter.check(&key) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
            too_many_requests(retry_after)
        }
    }
}

/// Enforce the default hourly and daily limits.
pub async fn default_rate_limit(
    State(limits): State<RateLimits>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_ip(request.headers(), request.extensions());
    match limits.check_default(&key) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(client = %key, path = %request.uri().path(), "Default rate limit exceeded");
            too_many_requests(retry_after)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_exhausts_and_reports_wait() {
        let limiter = RateLimiter::new(RateLimitRule::new(2, 60), true);
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());
        let wait = limiter.check("10.0.0.1").unwrap_err();
        assert!(wait > Duration::from_secs(20) && wait <= Duration::from_secs(30));

        // Other clients are independent.
        assert!(limiter.check("10.0.0.2").is_ok());
    }

    #[test]
    fn test_disabled_limiter_passes() {
        let limiter = RateLimiter::new(RateLimitRule::new(1, 3600), false);
        for _ in 0..10 {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn test_daily_refusal_keeps_hourly_quota() {
        let config = RateLimitConfig {
            default_hourly: RateLimitRule::new(3, 3600),
            default_daily: RateLimitRule::new(1, 86_400),
            ..RateLimitConfig::default()
        };
        let limits = RateLimits::from_config(&config);

        assert!(limits.check_default("10.0.0.9").is_ok());
        for _ in 0..5 {
            assert!(limits.check_default("10.0.0.9").is_err());
        }
        // Only the admitted request was charged to the hourly bucket.
        assert!(limits.hourly.check("10.0.0.9").is_ok());
        assert!(limits.hourly.check("10.0.0.9").is_ok());
        assert!(limits.hourly.check("10.0.0.9").is_err());
    }

    #[test]
    fn test_prune_keeps_drained_buckets() {
        let limiter = RateLimiter::new(RateLimitRule::new(1, 3600), true);
        assert!(limiter.check("a").is_ok());
        limiter.prune();
        assert_eq!(limiter.tracked(), 1);
    }
}
