//! Rate limiter implementation
//!
//! Provides sliding window rate limiting per client and route group.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Request budget for one route group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub per_minute: u32,
    pub per_hour: Option<u32>,
}

impl RateLimitPolicy {
    pub fn per_minute(limit: u32) -> Self {
        Self {
            per_minute: limit,
            per_hour: None,
        }
    }

    pub fn with_per_hour(mut self, limit: u32) -> Self {
        self.per_hour = Some(limit);
        self
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the current minute
    pub remaining: u32,
    /// Limit of the window that decided the outcome
    pub limit: u32,
    /// Time until the limit resets (in seconds)
    pub reset_in_seconds: u64,
    /// Which limit was hit (if any)
    pub limit_type: Option<LimitType>,
}

/// Type of rate limit that was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    PerMinute,
    PerHour,
}

impl std::fmt::Display for LimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerMinute => write!(f, "per_minute"),
            Self::PerHour => write!(f, "per_hour"),
        }
    }
}

/// Sliding window rate limiter keyed by arbitrary strings
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Request timestamps per key
    records: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    /// How often idle keys are swept
    cleanup_interval: Duration,
    /// Last sweep time
    last_cleanup: Arc<RwLock<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            cleanup_interval: CLEANUP_INTERVAL,
            last_cleanup: Arc::new(RwLock::new(Instant::now())),
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the policy for `key` and record the request when allowed
    pub async fn check_and_record(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitResult {
        self.check_and_record_at(key, policy, Instant::now()).await
    }

    async fn check_and_record_at(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        now: Instant,
    ) -> RateLimitResult {
        self.maybe_cleanup(now).await;

        let mut records = self.records.write().await;
        let timestamps = records.entry(key.to_string()).or_default();

        // Nothing older than the longest window matters
        let horizon = now.checked_sub(HOUR).unwrap_or(now);
        timestamps.retain(|t| *t > horizon);

        let result = evaluate(timestamps, policy, now);
        if result.allowed {
            timestamps.push(now);
        }

        result
    }

    /// Drop keys with no requests inside the longest window
    async fn maybe_cleanup(&self, now: Instant) {
        let should_cleanup = {
            let last = self.last_cleanup.read().await;
            now.saturating_duration_since(*last) >= self.cleanup_interval
        };

        if !should_cleanup {
            return;
        }

        let mut last = self.last_cleanup.write().await;
        *last = now;

        let horizon = now.checked_sub(HOUR).unwrap_or(now);
        let mut records = self.records.write().await;
        for timestamps in records.values_mut() {
            timestamps.retain(|t| *t > horizon);
        }
        records.retain(|_, timestamps| !timestamps.is_empty());

        debug!(tracked_keys = records.len(), "Rate limiter swept idle keys");
    }
}

fn evaluate(timestamps: &[Instant], policy: &RateLimitPolicy, now: Instant) -> RateLimitResult {
    let minute_count = window_count(timestamps, MINUTE, now);

    if minute_count >= policy.per_minute {
        return denied(timestamps, MINUTE, now, policy.per_minute, LimitType::PerMinute);
    }

    if let Some(per_hour) = policy.per_hour {
        if window_count(timestamps, HOUR, now) >= per_hour {
            return denied(timestamps, HOUR, now, per_hour, LimitType::PerHour);
        }
    }

    RateLimitResult {
        allowed: true,
        remaining: policy.per_minute.saturating_sub(minute_count + 1),
        limit: policy.per_minute,
        reset_in_seconds: MINUTE.as_secs(),
        limit_type: None,
    }
}

fn window_count(timestamps: &[Instant], window: Duration, now: Instant) -> u32 {
    let start = now.checked_sub(window).unwrap_or(now);
    timestamps.iter().filter(|t| **t > start).count() as u32
}

fn denied(
    timestamps: &[Instant],
    window: Duration,
    now: Instant,
    limit: u32,
    limit_type: LimitType,
) -> RateLimitResult {
    let start = now.checked_sub(window).unwrap_or(now);
    let reset_in = timestamps
        .iter()
        .filter(|t| **t > start)
        .min()
        .map(|oldest| {
            let elapsed = now.duration_since(*oldest);
            window.as_secs().saturating_sub(elapsed.as_secs()).max(1)
        })
        .unwrap_or(window.as_secs());

    RateLimitResult {
        allowed: false,
        remaining: 0,
        limit,
        reset_in_seconds: reset_in,
        limit_type: Some(limit_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_per_minute_limit() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::per_minute(5);

        for expected_remaining in (0..5).rev() {
            let result = limiter.check_and_record("10.0.0.1", &policy).await;
            assert!(result.allowed);
            assert_eq!(result.remaining, expected_remaining);
        }

        let result = limiter.check_and_record("10.0.0.1", &policy).await;
        assert!(!result.allowed);
        assert_eq!(result.limit_type, Some(LimitType::PerMinute));
        assert!(result.reset_in_seconds >= 1 && result.reset_in_seconds <= 60);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::per_minute(1);

        assert!(limiter.check_and_record("a", &policy).await.allowed);
        assert!(!limiter.check_and_record("a", &policy).await.allowed);
        assert!(limiter.check_and_record("b", &policy).await.allowed);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::per_minute(1);
        let start = Instant::now();

        let at = |secs| start + Duration::from_secs(secs);

        assert!(limiter.check_and_record_at("a", &policy, at(0)).await.allowed);
        assert!(!limiter.check_and_record_at("a", &policy, at(30)).await.allowed);
        assert!(limiter.check_and_record_at("a", &policy, at(61)).await.allowed);
    }

    #[tokio::test]
    async fn test_per_hour_limit() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::per_minute(5).with_per_hour(6);
        let start = Instant::now();

        for i in 0..6 {
            let at = start + Duration::from_secs(61 * i);
            assert!(limiter.check_and_record_at("a", &policy, at).await.allowed);
        }

        let result = limiter
            .check_and_record_at("a", &policy, start + Duration::from_secs(61 * 6))
            .await;
        assert!(!result.allowed);
        assert_eq!(result.limit_type, Some(LimitType::PerHour));
        assert_eq!(result.limit, 6);
    }

    #[tokio::test]
    async fn test_idle_keys_are_swept() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::per_minute(5);
        let start = Instant::now();

        for i in 0..10_000 {
            let key = format!("client-{}", i);
            limiter.check_and_record_at(&key, &policy, start).await;
        }
        assert_eq!(limiter.records.read().await.len(), 10_000);

        let later = start + Duration::from_secs(2 * 3600);
        assert!(limiter.check_and_record_at("late", &policy, later).await.allowed);

        let records = limiter.records.read().await;
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("late"));
    }

    #[tokio::test]
    async fn test_sweep_keeps_keys_inside_the_hour() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::per_minute(1);
        let start = Instant::now();

        limiter.check_and_record_at("old", &policy, start).await;
        limiter
            .check_and_record_at("recent", &policy, start + Duration::from_secs(3000))
            .await;

        let later = start + Duration::from_secs(3700);
        limiter.check_and_record_at("new", &policy, later).await;

        let records = limiter.records.read().await;
        assert!(!records.contains_key("old"));
        assert!(records.contains_key("recent"));
        assert!(records.contains_key("new"));
    }

    #[test]
    fn test_limit_type_display() {
        assert_eq!(LimitType::PerMinute.to_string(), "per_minute");
        assert_eq!(LimitType::PerHour.to_string(), "per_hour");
    }
}
