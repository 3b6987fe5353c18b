use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::query::types::{FieldScope, SortBy};
use crate::search::results::SearchHit;

/// Result cache for avoiding recomputation
pub struct ResultCache {
    cache: Mutex<LruCache<QueryKey, CachedResultSet>>,
    capacity: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

/// Everything that can change a result set. The snapshot version keeps an
/// entry from outliving the records it was computed against.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub snapshot_version: u64,
    pub query: String,
    pub field_scope: FieldScope,
    pub limit: usize,
    pub sort_by: SortBy,
    pub include_content: bool,
    pub file_types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CachedResultSet {
    pub hits: Vec<SearchHit>,
    pub total_hits: usize,
    pub created_at: DateTime<Utc>,
}

impl CachedResultSet {
    pub fn new(hits: Vec<SearchHit>, total_hits: usize) -> Self {
        CachedResultSet {
            hits,
            total_hits,
            created_at: Utc::now(),
        }
    }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ResultCache {
            cache: Mutex::new(LruCache::new(cap)),
            capacity: cap.get(),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedResultSet> {
        let mut cache = self.cache.lock();
        if let Some(results) = cache.get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            debug!(query = %key.query, version = key.snapshot_version, "result cache hit");
            Some(results.clone())
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            debug!(query = %key.query, version = key.snapshot_version, "result cache miss");
            None
        }
    }

    pub fn put(&self, key: QueryKey, results: CachedResultSet) {
        self.cache.lock().put(key, results);
    }

    /// Drop every entry; hit/miss counters are kept.
    pub fn invalidate_all(&self) {
        self.cache.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            size: self.len(),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(version: u64, query: &str) -> QueryKey {
        QueryKey {
            snapshot_version: version,
            query: query.to_string(),
            field_scope: FieldScope::All,
            limit: 10,
            sort_by: SortBy::Relevance,
            include_content: false,
            file_types: Vec::new(),
        }
    }

    #[test]
    fn hit_and_miss_are_counted() {
        let cache = ResultCache::new(4);
        assert!(cache.get(&key(1, "search")).is_none());
        cache.put(key(1, "search"), CachedResultSet::new(Vec::new(), 0));
        assert!(cache.get(&key(1, "search")).is_some());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn other_version_does_not_hit() {
        let cache = ResultCache::new(4);
        cache.put(key(1, "search"), CachedResultSet::new(Vec::new(), 0));
        assert!(cache.get(&key(2, "search")).is_none());
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = ResultCache::new(2);
        cache.put(key(1, "a"), CachedResultSet::new(Vec::new(), 0));
        cache.put(key(1, "b"), CachedResultSet::new(Vec::new(), 0));
        cache.get(&key(1, "a"));
        cache.put(key(1, "c"), CachedResultSet::new(Vec::new(), 0));

        assert!(cache.get(&key(1, "a")).is_some());
        assert!(cache.get(&key(1, "b")).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_all_empties_cache() {
        let cache = ResultCache::new(0);
        assert_eq!(cache.stats().capacity, 1);
        cache.put(key(1, "a"), CachedResultSet::new(Vec::new(), 0));
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
