//! Query cache for computed site summaries.
//!
//! Entries live in an in-memory, TTL-bounded store. Every write touching a
//! site invalidates that site's entry, so the next read recomputes it.
//! Invalidation also bumps a per-site generation; a summary computed under
//! an older generation is never kept.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::balance::SiteSummary;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
}

impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        ServiceError::CacheError(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() >= expires_at)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::OperationFailed("cache lock poisoned".to_string())
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.read().map(|store| store.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        {
            let store = self.store.read().map_err(poisoned)?;
            match store.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        self.store.write().map_err(poisoned)?.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.store
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.store.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

/// Site-summary cache. Backend failures are logged and treated as a miss;
/// the summary is always recomputable from the database.
#[derive(Clone)]
pub struct SummaryCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Option<Duration>,
    generations: Arc<Mutex<HashMap<Uuid, u64>>>,
}

impl SummaryCache {
    /// `ttl == None` disables caching entirely.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Option<Duration>) -> Self {
        Self {
            backend,
            ttl,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn in_memory(ttl: Option<Duration>) -> Self {
        Self::new(Arc::new(InMemoryCache::new()), ttl)
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    /// Current write generation of `site_id`. Read it before loading the
    /// ledger and hand it to [`SummaryCache::put`].
    pub fn generation(&self, site_id: Uuid) -> u64 {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        generations.get(&site_id).copied().unwrap_or(0)
    }

    fn bump_generation(&self, site_id: Uuid) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let generation = generations.entry(site_id).or_insert(0);
        *generation = generation.wrapping_add(1);
    }

    fn key(site_id: Uuid) -> String {
        format!("site-summary:{}", site_id)
    }

    pub async fn get(&self, site_id: Uuid) -> Option<SiteSummary> {
        if !self.is_enabled() {
            return None;
        }

        let raw = match self.backend.get(&Self::key(site_id)).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(%site_id, error = %err, "Summary cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(summary) => {
                debug!(%site_id, "Summary cache hit");
                Some(summary)
            }
            Err(err) => {
                warn!(%site_id, error = %err, "Discarding undecodable summary cache entry");
                self.invalidate(site_id).await;
                None
            }
        }
    }

    /// Stores a summary computed from a ledger loaded under `generation`.
    /// Nothing is kept if a write invalidated the site in the meantime.
    pub async fn put(&self, site_id: Uuid, generation: u64, summary: &SiteSummary) {
        if !self.is_enabled() {
            return;
        }
        if self.generation(site_id) != generation {
            debug!(%site_id, "Skipping summary computed before a write");
            return;
        }

        let result = match serde_json::to_string(summary) {
            Ok(raw) => self.backend.set(&Self::key(site_id), &raw, self.ttl).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            warn!(%site_id, error = %err, "Summary cache write failed");
            return;
        }

        // an invalidation that ran while the entry was being stored
        if self.generation(site_id) != generation {
            self.drop_entry(site_id).await;
        }
    }

    /// Drops the cached summary of `site_id`; call after every write to the site.
    pub async fn invalidate(&self, site_id: Uuid) {
        self.bump_generation(site_id);
        self.drop_entry(site_id).await;
    }

    async fn drop_entry(&self, site_id: Uuid) {
        if let Err(err) = self.backend.delete(&Self::key(site_id)).await {
            warn!(%site_id, error = %err, "Summary cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn summary() -> SiteSummary {
        SiteSummary {
            funds_received: dec!(10000),
            total_balance: dec!(10000),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn in_memory_entries_expire() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_millis(0)))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());

        cache.set("k", "v", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn summary_round_trips_until_invalidated() {
        let cache = SummaryCache::in_memory(Some(Duration::from_secs(60)));
        let site_id = Uuid::new_v4();

        assert_eq!(cache.get(site_id).await, None);
        cache.put(site_id, cache.generation(site_id), &summary()).await;
        assert_eq!(cache.get(site_id).await, Some(summary()));

        cache.invalidate(site_id).await;
        assert_eq!(cache.get(site_id).await, None);
    }

    #[tokio::test]
    async fn invalidation_is_per_site() {
        let cache = SummaryCache::in_memory(Some(Duration::from_secs(60)));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        cache.put(a, cache.generation(a), &summary()).await;
        cache.put(b, cache.generation(b), &summary()).await;

        cache.invalidate(a).await;
        assert_eq!(cache.get(a).await, None);
        assert_eq!(cache.get(b).await, Some(summary()));
    }

    #[tokio::test]
    async fn disabled_cache_never_hits() {
        let cache = SummaryCache::in_memory(None);
        let site_id = Uuid::new_v4();
        cache.put(site_id, cache.generation(site_id), &summary()).await;
        assert_eq!(cache.get(site_id).await, None);
    }

    #[tokio::test]
    async fn corrupt_entries_are_dropped() {
        let backend = Arc::new(InMemoryCache::new());
        let cache = SummaryCache::new(backend.clone(), Some(Duration::from_secs(60)));
        let site_id = Uuid::new_v4();
        backend
            .set(&SummaryCache::key(site_id), "not json", None)
            .await
            .unwrap();

        assert_eq!(cache.get(site_id).await, None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn summary_loaded_before_a_write_is_not_cached() {
        let cache = SummaryCache::in_memory(Some(Duration::from_secs(60)));
        let site_id = Uuid::new_v4();

        let generation = cache.generation(site_id);
        // an expense lands while the ledger is being loaded
        cache.invalidate(site_id).await;
        cache.put(site_id, generation, &summary()).await;
        assert_eq!(cache.get(site_id).await, None);

        let generation = cache.generation(site_id);
        cache.put(site_id, generation, &summary()).await;
        assert_eq!(cache.get(site_id).await, Some(summary()));
    }

    /// Backend that runs one invalidation in the middle of storing an entry.
    #[derive(Default)]
    struct InterleavedBackend {
        inner: InMemoryCache,
        writer: Mutex<Option<(SummaryCache, Uuid)>>,
    }

    #[async_trait::async_trait]
    impl CacheBackend for InterleavedBackend {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
            let writer = self.writer.lock().unwrap().take();
            if let Some((cache, site_id)) = writer {
                cache.invalidate(site_id).await;
            }
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.inner.delete(key).await
        }

        async fn clear(&self) -> Result<(), CacheError> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn invalidation_during_store_drops_the_entry() {
        let backend = Arc::new(InterleavedBackend::default());
        let cache = SummaryCache::new(backend.clone(), Some(Duration::from_secs(60)));
        let site_id = Uuid::new_v4();
        *backend.writer.lock().unwrap() = Some((cache.clone(), site_id));

        cache.put(site_id, cache.generation(site_id), &summary()).await;
        assert_eq!(cache.get(site_id).await, None);
        assert!(backend.inner.is_empty());
        assert_eq!(cache.generation(site_id), 1);
    }
}
