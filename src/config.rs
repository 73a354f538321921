//! Engine configuration
//!
//! Knobs for the commit retry loop, the store's lock timeout and the
//! idempotency record lifetime. Values come from the CLI (with environment
//! fallbacks) or from [`EngineConfig::default`].

use std::time::Duration;

use tracing::warn;

/// Configuration for the transfer engine and its in-memory store
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// How many times a transient failure of the atomic unit is retried
    ///
    /// A request makes at most `1 + max_commit_retries` attempts.
    pub max_commit_retries: u32,

    /// Base delay between attempts; attempt `n` waits `retry_backoff * n`
    pub retry_backoff: Duration,

    /// Upper bound on acquiring per-account write access
    pub lock_timeout: Duration,

    /// Lifetime of an idempotency record
    pub idempotency_ttl: Duration,

    /// Period of the background idempotency sweep
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 3,
            retry_backoff: Duration::from_millis(10),
            lock_timeout: Duration::from_secs(5),
            idempotency_ttl: Duration::from_secs(86_400),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    /// Create a configuration, replacing zero durations with their defaults
    ///
    /// `max_commit_retries` and `retry_backoff` may legitimately be zero.
    pub fn new(
        max_commit_retries: u32,
        retry_backoff: Duration,
        lock_timeout: Duration,
        idempotency_ttl: Duration,
        sweep_interval: Duration,
    ) -> Self {
        let default = Self::default();

        Self {
            max_commit_retries,
            retry_backoff,
            lock_timeout: non_zero("lock_timeout", lock_timeout, default.lock_timeout),
            idempotency_ttl: non_zero("idempotency_ttl", idempotency_ttl, default.idempotency_ttl),
            sweep_interval: non_zero("sweep_interval", sweep_interval, default.sweep_interval),
        }
    }

    pub fn with_max_commit_retries(mut self, retries: u32) -> Self {
        self.max_commit_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = non_zero("lock_timeout", timeout, Self::default().lock_timeout);
        self
    }

    pub fn with_idempotency_ttl(mut self, ttl: Duration) -> Self {
        self.idempotency_ttl = non_zero("idempotency_ttl", ttl, Self::default().idempotency_ttl);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval =
            non_zero("sweep_interval", interval, Self::default().sweep_interval);
        self
    }
}

fn non_zero(name: &str, value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        warn!(
            setting = name,
            default = ?default,
            "Invalid zero value, using default"
        );
        default
    } else {
        value
    }
}
