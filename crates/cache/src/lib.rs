//! Snapshot cache for Breathwise.
//!
//! Fused snapshots are shared between nearby callers for a fixed TTL. Keys
//! combine a quantized location with the set of tracked metrics, so two
//! deployments tracking different metrics never see each other's entries.
//!
//! Entries live in a sharded map: a read only contends with writes to keys
//! in the same shard, and nothing is held across the upstream fetch in
//! [`SnapshotCache::get_or_fuse`].

use breathwise_config::CacheConfig;
use breathwise_core::error::{Error, Result};
use breathwise_core::location::Location;
use breathwise_core::metric::MetricKind;
use breathwise_core::snapshot::FusedSnapshot;
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Rendered as `loc:<lat>,<lon>|m:<codes>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(location: &Location, precision_deg: f64, kinds: &[MetricKind]) -> Self {
        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();
        let codes: Vec<&str> = kinds.iter().map(|k| k.code()).collect();
        Self(format!(
            "loc:{}|m:{}",
            location.quantize(precision_deg),
            codes.join(",")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct Entry {
    snapshot: Arc<FusedSnapshot>,
    expires_at: Instant,
}

pub struct SnapshotCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    precision_deg: f64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SnapshotCache {
    pub fn new(ttl: Duration, precision_deg: f64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            precision_deg,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.grid_precision_deg)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Key for a location under this cache's grid precision.
    pub fn key_for(&self, location: &Location, kinds: &[MetricKind]) -> CacheKey {
        CacheKey::new(location, self.precision_deg, kinds)
    }

    /// Look up a live entry. An expired entry is removed and counts as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<FusedSnapshot>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key.as_str()) {
            if now < entry.expires_at {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.snapshot));
            }
        }

        if self
            .entries
            .remove_if(key.as_str(), |_, e| now >= e.expires_at)
            .is_some()
        {
            debug!(key = %key, "Cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a snapshot. Snapshots without a single available metric are
    /// not cached; returns whether the entry was stored.
    pub fn set(&self, key: CacheKey, snapshot: Arc<FusedSnapshot>) -> bool {
        if snapshot.is_empty() {
            debug!(key = %key, "Not caching empty snapshot");
            return false;
        }
        self.entries.insert(
            key.0,
            Entry {
                snapshot,
                expires_at: Instant::now() + self.ttl,
            },
        );
        true
    }

    /// Return the cached snapshot or run `fuse` and cache its result.
    /// Concurrent misses on the same key may both fuse; the last write wins.
    pub async fn get_or_fuse<F, Fut>(&self, key: CacheKey, fuse: F) -> Arc<FusedSnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FusedSnapshot>,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let snapshot = Arc::new(fuse().await);
        self.set(key, Arc::clone(&snapshot));
        snapshot
    }

    /// Remove every entry whose rendered key matches a glob (`*` wildcard).
    pub fn invalidate(&self, pattern: &str) -> Result<usize> {
        if pattern.trim().is_empty() {
            return Err(Error::InvalidRequest("invalidation pattern is empty".into()));
        }
        let matcher = glob_to_regex(pattern)?;

        let mut removed = 0;
        self.entries.retain(|key, _| {
            let hit = matcher.is_match(key);
            if hit {
                removed += 1;
            }
            !hit
        });
        info!(pattern, removed, "Cache invalidated");
        Ok(removed)
    }

    /// Drop all expired entries.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| now < e.expires_at);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodically purge expired entries until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.purge_expired();
            }
        })
    }
}

fn glob_to_regex(pattern: &str) -> Result<regex_lite::Regex> {
    let body: Vec<String> = pattern.split('*').map(regex_lite::escape).collect();
    regex_lite::Regex::new(&format!("^{}$", body.join(".*")))
        .map_err(|e| Error::InvalidRequest(format!("bad invalidation pattern: {e}")))
}
