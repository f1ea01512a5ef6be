use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct EndpointRateLimiter {
    state: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    auth_limit: u32,
    sync_limit: u32,
    metrics: Arc<RateLimitMetrics>,
}

#[derive(Clone, Copy)]
pub enum ProtectedEndpoint {
    /// Login and registration attempts, keyed by normalized email.
    Auth,
    /// Snapshot reads and writes, keyed by user id.
    Sync,
}

#[derive(Default)]
struct RateLimitMetrics {
    auth_allowed: AtomicU64,
    auth_limited: AtomicU64,
    sync_allowed: AtomicU64,
    sync_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub auth_allowed: u64,
    pub auth_limited: u64,
    pub sync_allowed: u64,
    pub sync_limited: u64,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl EndpointRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_window,
            config.auth_rate_limit_per_window,
            config.sync_rate_limit_per_window,
        )
    }

    fn new(window: Duration, auth_limit: u32, sync_limit: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window,
            auth_limit,
            sync_limit,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    pub async fn check(&self, endpoint: ProtectedEndpoint, subject: &str) -> Result<(), AppError> {
        let limit = match endpoint {
            ProtectedEndpoint::Auth => self.auth_limit,
            ProtectedEndpoint::Sync => self.sync_limit,
        };

        let key = format!("{}:{subject}", endpoint.label());
        let now = Instant::now();
        let mut guard = self.state.lock().await;
        // Expired windows are dropped once the table grows large.
        if guard.len() > 10_000 {
            let window = self.window;
            guard.retain(|_, entry| now.duration_since(entry.started_at) < window);
        }
        let entry = guard.entry(key).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs()
                .max(1);
            self.mark_limited(endpoint);
            tracing::warn!(
                endpoint = endpoint.label(),
                subject = subject_fingerprint(subject),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                "Too many requests, try again later",
                retry_after_secs,
            ));
        }

        entry.count += 1;
        self.mark_allowed(endpoint);
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            auth_allowed: self.metrics.auth_allowed.load(Ordering::Relaxed),
            auth_limited: self.metrics.auth_limited.load(Ordering::Relaxed),
            sync_allowed: self.metrics.sync_allowed.load(Ordering::Relaxed),
            sync_limited: self.metrics.sync_limited.load(Ordering::Relaxed),
        }
    }

    fn mark_allowed(&self, endpoint: ProtectedEndpoint) {
        let counter = match endpoint {
            ProtectedEndpoint::Auth => &self.metrics.auth_allowed,
            ProtectedEndpoint::Sync => &self.metrics.sync_allowed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn mark_limited(&self, endpoint: ProtectedEndpoint) {
        let counter = match endpoint {
            ProtectedEndpoint::Auth => &self.metrics.auth_limited,
            ProtectedEndpoint::Sync => &self.metrics.sync_limited,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl ProtectedEndpoint {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Sync => "sync",
        }
    }
}

/// Stable, non-reversible tag for logging user ids and emails.
pub fn subject_fingerprint(subject: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    subject.hash(&mut hasher);
    hasher.finish()
}
