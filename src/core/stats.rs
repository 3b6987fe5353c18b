use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::query::cache::CacheStats;

/// Database statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStats {
    // Store
    pub store: String,
    pub record_count: usize,
    pub skipped_rows: usize,
    pub snapshot_version: u64,

    // Index
    pub index_size: usize,
    pub total_tokens: usize,
    pub index_builds: u64,
    pub relationship_count: usize,
    pub edge_count: usize,

    // Queries
    pub search_count: u64,
    pub cache_size: usize,
    pub cache_stats: CacheStats,
    pub history_size: usize,

    /// Non-empty values per field name
    pub field_distribution: BTreeMap<String, usize>,
}

impl DatabaseStats {
    /// Share of records with a value in `field`, in [0, 1]
    pub fn coverage(&self, field: &str) -> f64 {
        if self.record_count == 0 {
            return 0.0;
        }
        self.field_distribution.get(field).copied().unwrap_or(0) as f64 / self.record_count as f64
    }
}
