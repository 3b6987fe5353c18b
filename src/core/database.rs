use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::stats::DatabaseStats;
use crate::core::types::{Field, MetadataRecord, RecordPatch};
use crate::mvcc::controller::{Snapshot, SnapshotController};
use crate::query::history::SearchHistory;
use crate::query::types::SearchOptions;
use crate::search::executor::QueryEngine;
use crate::search::results::SearchResults;
use crate::storage::backend::PersistenceBackend;
use crate::storage::csv_backend::CsvBackend;
use crate::storage::record_store::{RecordStore, WriteGate};

/// Header search database: record store, snapshot index, query engine.
///
/// Reads work on the current `Snapshot` and never wait for writers. Writes
/// are serialized and publish a rebuilt snapshot before they return.
pub struct HeaderDatabase {
    config: Config,
    store: RecordStore,
    mvcc: Arc<SnapshotController>,
    engine: QueryEngine,
    history: SearchHistory,

    write_lock: Mutex<()>,
    // Store generation the current snapshot was built from
    indexed_generation: AtomicU64,
}

impl HeaderDatabase {
    /// Open the CSV store at `config.store_path`, creating it if missing.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let backend = CsvBackend::open(&config.store_path, config.lock_timeout(), config.lock_retry())?;
        Self::with_backend(Box::new(backend), config)
    }

    pub fn with_backend(backend: Box<dyn PersistenceBackend>, config: Config) -> Result<Self> {
        config.validate()?;
        let store = RecordStore::open(backend, config.duplicate_policy, config.lock_timeout())?;
        let history = match &config.history_path {
            Some(path) => SearchHistory::open(path, config.history_limit)?,
            None => SearchHistory::new(config.history_limit),
        };

        let engine = QueryEngine::new(&config);
        let mvcc = Arc::new(SnapshotController::new());
        let snapshot = mvcc.publish(store.all(), engine.tokenizer.as_ref());

        info!(
            store = %store.describe(),
            records = snapshot.len(),
            skipped_rows = store.skipped_rows(),
            terms = snapshot.index.len(),
            "opened header database"
        );

        Ok(HeaderDatabase {
            indexed_generation: AtomicU64::new(store.generation()),
            config,
            store,
            mvcc,
            engine,
            history,
            write_lock: Mutex::new(()),
        })
    }

    /// Install a pre-write approval hook.
    pub fn with_gate(mut self, gate: Box<dyn WriteGate>) -> Self {
        self.store = self.store.with_gate(gate);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.mvcc.current_snapshot()
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        let snapshot = self.mvcc.current_snapshot();
        let results = self.engine.execute(&snapshot, query, options)?;

        if !query.trim().is_empty() {
            self.history.record(query.trim(), options);
        }

        debug!(
            query,
            hits = results.hits.len(),
            total_hits = results.total_hits,
            from_cache = results.from_cache,
            took_ms = results.took_ms,
            "search"
        );
        Ok(results)
    }

    /// Search with default options and the configured default limit.
    pub fn search_default(&self, query: &str) -> Result<SearchResults> {
        let options = SearchOptions::default().with_limit(self.config.default_limit);
        self.search(query, &options)
    }

    /// Completions for a partial query: matching history first, then field
    /// values of current records.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        let partial = partial.trim();
        if partial.is_empty() || limit == 0 {
            return Vec::new();
        }
        let needle = partial.to_lowercase();

        let mut candidates = self.history.matching(partial);
        let snapshot = self.mvcc.current_snapshot();
        for record in snapshot.records.iter() {
            for field in Field::SUGGEST {
                let value = record.field(field);
                if !value.is_empty() && value.to_lowercase().contains(&needle) {
                    candidates.push(value.to_string());
                }
            }
        }

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.clone()));
        candidates.truncate(limit);
        candidates
    }

    pub fn add(&self, record: MetadataRecord) -> Result<String> {
        let _guard = self.lock_writes()?;
        let result = self.store.add(record);
        self.sync_snapshot();
        result
    }

    pub fn update(&self, id: &str, patch: &RecordPatch) -> Result<bool> {
        let _guard = self.lock_writes()?;
        let result = self.store.update(id, patch);
        self.sync_snapshot();
        result
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.lock_writes()?;
        let result = self.store.delete(id);
        self.sync_snapshot();
        result
    }

    pub fn get(&self, id: &str) -> Option<MetadataRecord> {
        self.mvcc.current_snapshot().by_id(id).cloned()
    }

    pub fn all(&self) -> Arc<Vec<MetadataRecord>> {
        self.mvcc.current_snapshot().records.clone()
    }

    /// Outgoing related ids, dangling ones included.
    pub fn neighbors(&self, id: &str) -> Vec<String> {
        self.mvcc.current_snapshot().graph.neighbors(id).to_vec()
    }

    /// Related records that exist; dangling ids are skipped.
    pub fn related(&self, id: &str) -> Vec<MetadataRecord> {
        let snapshot = self.mvcc.current_snapshot();
        snapshot
            .graph
            .neighbors(id)
            .iter()
            .filter_map(|target| snapshot.by_id(target).cloned())
            .collect()
    }

    pub fn reachable(&self, id: &str, max_depth: usize) -> Vec<String> {
        self.mvcc.current_snapshot().graph.reachable(id, max_depth)
    }

    /// Reload from the backing store, picking up writes from other processes.
    pub fn refresh(&self) -> Result<usize> {
        let _guard = self.lock_writes()?;
        let records = self.store.refresh()?;
        self.sync_snapshot();
        Ok(records.len())
    }

    pub fn clear_caches(&self) {
        self.engine.cache.invalidate_all();
        info!("cleared result cache");
    }

    pub fn stats(&self) -> DatabaseStats {
        let snapshot = self.mvcc.current_snapshot();

        let mut field_distribution = BTreeMap::new();
        for field in Field::ALL {
            let filled = snapshot.records.iter().filter(|r| !r.field(field).is_empty()).count();
            field_distribution.insert(field.name().to_string(), filled);
        }
        let cache_stats = self.engine.cache.stats();

        DatabaseStats {
            store: self.store.describe(),
            record_count: snapshot.len(),
            skipped_rows: self.store.skipped_rows(),
            snapshot_version: snapshot.version,
            index_size: snapshot.index.len(),
            total_tokens: snapshot.index.total_tokens(),
            index_builds: self.mvcc.builds(),
            relationship_count: snapshot.graph.len(),
            edge_count: snapshot.graph.edge_count(),
            search_count: self.engine.search_count(),
            cache_size: cache_stats.size,
            cache_stats,
            history_size: self.history.len(),
            field_distribution,
        }
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        let start = Instant::now();
        self.write_lock
            .try_lock_for(self.config.lock_timeout())
            .ok_or_else(|| Error::LockTimeout {
                resource: "database writer".to_string(),
                waited: start.elapsed(),
            })
    }

    /// Rebuild and publish if the store moved since the last build. Caller
    /// holds the write lock.
    fn sync_snapshot(&self) {
        let generation = self.store.generation();
        if generation == self.indexed_generation.load(Ordering::Acquire) {
            return;
        }

        let started = Instant::now();
        let snapshot = self.mvcc.publish(self.store.all(), self.engine.tokenizer.as_ref());
        self.indexed_generation.store(generation, Ordering::Release);
        self.engine.cache.invalidate_all();

        debug!(
            version = snapshot.version,
            records = snapshot.len(),
            rebuild_ms = started.elapsed().as_millis() as u64,
            "rebuilt index"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_backend::MemoryBackend;

    fn database() -> HeaderDatabase {
        HeaderDatabase::with_backend(Box::new(MemoryBackend::new()), Config::default()).unwrap()
    }

    #[test]
    fn writes_publish_new_snapshots() {
        let db = database();
        let v0 = db.snapshot().version;
        db.add(MetadataRecord::new("A1", "Search Engine Design", "WOLFIE")).unwrap();
        assert!(db.snapshot().version > v0);
        assert_eq!(db.search_default("search").unwrap().ids(), vec!["A1"]);
    }

    #[test]
    fn failed_write_leaves_snapshot_alone() {
        let db = database();
        let builds = db.stats().index_builds;
        assert!(db.delete("missing").is_err());
        assert_eq!(db.stats().index_builds, builds);
    }

    #[test]
    fn write_clears_cache() {
        let db = database();
        db.add(MetadataRecord::new("A1", "Search Engine Design", "WOLFIE")).unwrap();
        db.search_default("search").unwrap();
        assert_eq!(db.stats().cache_size, 1);

        db.add(MetadataRecord::new("A2", "Search Notes", "WOLFIE")).unwrap();
        assert_eq!(db.stats().cache_size, 0);
        assert_eq!(db.search_default("search").unwrap().total_hits, 2);
    }

    #[test]
    fn suggest_prefers_history_then_fields() {
        let db = database();
        db.add(MetadataRecord::new("A1", "Search Engine Design", "WOLFIE")).unwrap();
        db.search_default("search engine").unwrap();

        let suggestions = db.suggest("sea", 10);
        assert_eq!(suggestions, vec!["search engine", "Search Engine Design"]);
        assert!(db.suggest("", 10).is_empty());
        assert_eq!(db.suggest("sea", 1).len(), 1);
    }

    #[test]
    fn related_skips_dangling_ids() {
        let db = database();
        db.add(MetadataRecord::new("A1", "One", "WOLFIE").with_related(&["A2", "GHOST"])).unwrap();
        db.add(MetadataRecord::new("A2", "Two", "WOLFIE")).unwrap();

        assert_eq!(db.neighbors("A1"), vec!["A2", "GHOST"]);
        let related: Vec<_> = db.related("A1").into_iter().map(|r| r.id).collect();
        assert_eq!(related, vec!["A2"]);
    }

    #[test]
    fn stats_report_field_distribution() {
        let db = database();
        db.add(MetadataRecord::new("A1", "One", "WOLFIE").with_field(Field::Key, "k")).unwrap();
        db.add(MetadataRecord::new("A2", "Two", "WOLFIE")).unwrap();

        let stats = db.stats();
        assert_eq!(stats.record_count, 2);
        assert_eq!(stats.field_distribution["title"], 2);
        assert_eq!(stats.field_distribution["key"], 1);
        assert_eq!(stats.coverage("key"), 0.5);
        assert_eq!(stats.store, "memory");
    }
}
