use async_trait::async_trait;
use goguma_types::{ScoreReport, ScoreSource, SellerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::metrics;
use crate::reputation::ReputationProvider;

/// Default time a computed score is served from memory.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

struct CacheEntry {
    report: ScoreReport,
    stored_at: Instant,
}

/// Per-seller TTL cache in front of another [`ReputationProvider`].
///
/// Scores that degraded to the base value are not stored, so a recovered
/// backend is visible on the next request.
pub struct CachedReputation {
    inner: Arc<dyn ReputationProvider>,
    entries: RwLock<HashMap<SellerId, CacheEntry>>,
    // Bumped by every invalidation; a computation that overlapped one is
    // returned but not stored.
    generation: AtomicU64,
    ttl: Duration,
}

impl CachedReputation {
    pub fn new(inner: Arc<dyn ReputationProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            ttl,
        }
    }

    async fn cached(&self, seller: &SellerId) -> Option<ScoreReport> {
        let entries = self.entries.read().await;
        let entry = entries.get(seller)?;
        if entry.stored_at.elapsed() < self.ttl {
            return Some(entry.report.clone());
        }
        tracing::debug!("Cached charm temperature for {} expired", seller);
        None
    }

    /// Removes expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        metrics::set_cache_entries(entries.len());
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ReputationProvider for CachedReputation {
    async fn temperature(&self, seller: &SellerId) -> ScoreReport {
        if let Some(report) = self.cached(seller).await {
            tracing::debug!("Cache hit for charm temperature of {}", seller);
            metrics::record_cache_hit();
            return report;
        }

        metrics::record_cache_miss();
        let generation = self.generation.load(Ordering::Acquire);
        let report = self.inner.temperature(seller).await;

        if report.source != ScoreSource::Base && !self.ttl.is_zero() {
            let mut entries = self.entries.write().await;
            if self.generation.load(Ordering::Acquire) != generation {
                tracing::debug!("Not caching charm temperature for {}: invalidated while computing", seller);
                return report;
            }
            entries.insert(
                seller.clone(),
                CacheEntry {
                    report: report.clone(),
                    stored_at: Instant::now(),
                },
            );
            metrics::set_cache_entries(entries.len());
        }

        report
    }

    async fn invalidate(&self, seller: &SellerId) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        if entries.remove(seller).is_some() {
            tracing::debug!("Invalidated cached charm temperature for {}", seller);
        }
        metrics::set_cache_entries(entries.len());
        drop(entries);
        self.inner.invalidate(seller).await;
    }
}

/// Periodically drops expired entries from `cache`.
pub fn spawn_cache_cleanup_task(cache: Arc<CachedReputation>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} expired charm temperature entries", purged);
            }
        }
    })
}
