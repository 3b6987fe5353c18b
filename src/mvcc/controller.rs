use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::debug;
use crate::analysis::tokenizer::Tokenizer;
use crate::core::types::{MetadataRecord, RecordHandle};
use crate::index::graph::RelationshipGraph;
use crate::index::inverted::FieldIndex;

/// Records plus the indexes derived from them, frozen at one version.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub records: Arc<Vec<MetadataRecord>>,
    pub index: FieldIndex,
    pub graph: RelationshipGraph,
    pub positions: HashMap<String, RecordHandle>,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn build(version: u64, records: Arc<Vec<MetadataRecord>>, tokenizer: &dyn Tokenizer) -> Self {
        let index = FieldIndex::build(&records, tokenizer);
        let graph = RelationshipGraph::build(&records);
        let positions = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), RecordHandle::new(i)))
            .collect();

        Snapshot {
            version,
            records,
            index,
            graph,
            positions,
            timestamp: Utc::now(),
        }
    }

    pub fn record(&self, handle: RecordHandle) -> Option<&MetadataRecord> {
        self.records.get(handle.index())
    }

    pub fn by_id(&self, id: &str) -> Option<&MetadataRecord> {
        self.positions.get(id).and_then(|h| self.record(*h))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            version: 0,
            records: Arc::new(Vec::new()),
            index: FieldIndex::default(),
            graph: RelationshipGraph::default(),
            positions: HashMap::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Holds the published snapshot. Readers clone the `Arc` and keep working
/// on it while a writer swaps in the next one.
pub struct SnapshotController {
    current: RwLock<Arc<Snapshot>>,
    current_version: AtomicU64,
    builds: AtomicU64,
}

impl SnapshotController {
    pub fn new() -> Self {
        SnapshotController {
            current: RwLock::new(Arc::new(Snapshot::default())),
            current_version: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    /// Index `records` and make the result the current snapshot.
    pub fn publish(&self, records: Arc<Vec<MetadataRecord>>, tokenizer: &dyn Tokenizer) -> Arc<Snapshot> {
        let version = self.current_version.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(Snapshot::build(version, records, tokenizer));
        self.builds.fetch_add(1, Ordering::Relaxed);

        debug!(
            version,
            records = snapshot.len(),
            terms = snapshot.index.len(),
            edges = snapshot.graph.edge_count(),
            "published snapshot"
        );

        *self.current.write() = snapshot.clone();
        snapshot
    }

    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Number of index builds since startup
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

impl Default for SnapshotController {
    fn default() -> Self {
        Self::new()
    }
}
