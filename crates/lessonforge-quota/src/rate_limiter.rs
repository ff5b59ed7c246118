// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::{Quota, RateLimiter as GovernorLimiter};
use lessonforge_config::RateLimiterConfig;
use tokio::sync::Mutex;
use tracing::debug;

type Bucket = GovernorLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

fn quota_from(cfg: &RateLimiterConfig) -> Quota {
    let period = Duration::from_secs_f64(1.0 / cfg.rate.max(0.000_001));
    let burst = NonZeroU32::new(cfg.burst.max(1)).expect("burst clamped to >= 1 above");
    Quota::with_period(period)
        .expect("period is always positive")
        .allow_burst(burst)
}

struct Entry {
    bucket: Arc<Bucket>,
    last_seen: Instant,
}

/// Per-client-identity token-bucket limiter (spec.md §4.6 / C6-A), keyed by
/// whatever string the caller uses to identify a client (API key, session
/// owner, IP — the pipeline engine decides). Built on the same `governor`
/// GCRA limiter the gateway crate it was grounded on uses for its single
/// global bucket; here a fresh bucket is created per key on first use.
///
/// Buckets idle (untouched) for longer than `bucket_idle_eviction_secs` are
/// dropped on the next `sweep()` call, per spec.md §4.6's "buckets at full
/// level for longer than T are evicted" — approximated by wall-clock
/// idleness rather than inspecting bucket fill state, since a bucket left
/// untouched for the eviction window has long since refilled to capacity
/// whenever `burst / rate` (seconds to fill) is smaller than `T`, which
/// holds for every configured default.
pub struct KeyedRateLimiter {
    cfg: RateLimiterConfig,
    idle_eviction: Duration,
    buckets: Mutex<HashMap<String, Entry>>,
}

impl KeyedRateLimiter {
    pub fn new(cfg: RateLimiterConfig, idle_eviction: Duration) -> Self {
        Self {
            cfg,
            idle_eviction,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Check and consume one token for `key`. Returns `true` if the call is
    /// admitted, `false` if the bucket is exhausted.
    pub async fn allow(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let entry = buckets.entry(key.to_string()).or_insert_with(|| {
            debug!(key, "allocating new rate-limit bucket");
            Entry {
                bucket: Arc::new(GovernorLimiter::direct(quota_from(&self.cfg))),
                last_seen: now,
            }
        });
        entry.last_seen = now;
        entry.bucket.check().is_ok()
    }

    /// Evict buckets that have not been touched for longer than the
    /// configured idle window. Intended to be called periodically by a
    /// background task; never called from `allow()` itself so that the hot
    /// path stays a single lock/unlock.
    pub async fn sweep(&self) {
        let mut buckets = self.buckets.lock().await;
        let cutoff = self.idle_eviction;
        let before = buckets.len();
        buckets.retain(|_, entry| entry.last_seen.elapsed() < cutoff);
        let evicted = before - buckets.len();
        if evicted > 0 {
            debug!(evicted, "swept idle rate-limit buckets");
        }
    }

    pub async fn bucket_count(&self) -> usize {
        self.buckets.lock().await.len()
    }

    /// Spawn a background task that calls `sweep()` on `interval` for the
    /// lifetime of the returned handle's task (i.e. until the caller drops
    /// or aborts it, or the process exits). The limiter itself never
    /// schedules this on its own — `allow()` must stay a single lock/unlock
    /// on the hot path — so whoever owns the limiter is responsible for
    /// spawning one of these, the way `sven-gateway::gateway` spawns its
    /// long-running services with `tokio::spawn(service.run())`.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                self.sweep().await;
            }
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
