// src/limiter.rs
//! Per-source token buckets.
//!
//! One `RateLimiter` exists per `SourceKind` for the life of the process and is
//! handed to fetchers explicitly. Waiters queue on a fair tokio mutex, so the
//! head of the queue sleeps until its token refills and everyone behind it
//! follows in arrival order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::histogram;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::types::SourceKind;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    label: &'static str,
    /// Tokens added per second; `None` disables limiting.
    rate: Option<f64>,
    burst: f64,
    bucket: Mutex<Bucket>,
}

/// Proof that a token was taken. Carries the time spent waiting for it.
#[derive(Debug, Clone, Copy)]
pub struct Permit {
    pub waited: Duration,
}

impl RateLimiter {
    /// `ops` operations per `window`, starting with a full bucket.
    pub fn new(label: &'static str, ops: u32, window: Duration) -> Self {
        let ops = ops.max(1) as f64;
        let secs = window.as_secs_f64().max(f64::EPSILON);
        Self {
            label,
            rate: Some(ops / secs),
            burst: ops,
            bucket: Mutex::new(Bucket {
                tokens: ops,
                last: Instant::now(),
            }),
        }
    }

    pub fn per_second(label: &'static str, ops: u32) -> Self {
        Self::new(label, ops, Duration::from_secs(1))
    }

    /// No-op limiter for tests and local runs.
    pub fn unlimited(label: &'static str) -> Self {
        Self {
            label,
            rate: None,
            burst: 0.0,
            bucket: Mutex::new(Bucket {
                tokens: 0.0,
                last: Instant::now(),
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Suspends until a token is available, then consumes it.
    pub async fn acquire(&self) -> Permit {
        let Some(rate) = self.rate else {
            return Permit {
                waited: Duration::ZERO,
            };
        };

        let started = Instant::now();
        let mut bucket = self.bucket.lock().await;
        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(bucket.last).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * rate).min(self.burst);
            bucket.last = now;
            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                break;
            }
            let missing = 1.0 - bucket.tokens;
            sleep(Duration::from_secs_f64(missing / rate)).await;
        }
        drop(bucket);

        let waited = started.elapsed();
        histogram!("newscast_ratelimit_wait_ms", "source" => self.label)
            .record(waited.as_secs_f64() * 1_000.0);
        Permit { waited }
    }
}

/// Registry of limiters keyed by source kind, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct RateLimiters {
    by_kind: HashMap<SourceKind, Arc<RateLimiter>>,
}

impl RateLimiters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SourceKind, limiter: RateLimiter) -> Self {
        self.by_kind.insert(kind, Arc::new(limiter));
        self
    }

    /// Reference settings: N tokens per second for each source.
    pub fn per_second(news: u32, discussion: u32) -> Self {
        Self::new()
            .with(SourceKind::News, RateLimiter::per_second("news", news))
            .with(
                SourceKind::Discussion,
                RateLimiter::per_second("discussion", discussion),
            )
    }

    pub fn unlimited() -> Self {
        Self::new()
            .with(SourceKind::News, RateLimiter::unlimited("news"))
            .with(SourceKind::Discussion, RateLimiter::unlimited("discussion"))
    }

    /// Shared handle for `kind`; an unregistered kind gets an unlimited limiter.
    pub fn for_kind(&self, kind: SourceKind) -> Arc<RateLimiter> {
        self.by_kind
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(RateLimiter::unlimited(kind.as_str())))
    }

    pub async fn acquire(&self, kind: SourceKind) -> Permit {
        self.for_kind(kind).acquire().await
    }
}
