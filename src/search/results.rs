use std::cmp::Ordering;
use std::path::PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::types::Field;
use crate::query::types::SortBy;

/// Search results container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub total_hits: usize,
    pub took_ms: u64,
    pub from_cache: bool,
}

impl SearchResults {
    pub fn empty(query: &str) -> Self {
        SearchResults {
            query: query.to_string(),
            hits: Vec::new(),
            total_hits: 0,
            took_ms: 0,
            from_cache: false,
        }
    }

    pub fn max_score(&self) -> f32 {
        self.hits.iter().map(|h| h.score).fold(0.0, f32::max)
    }

    /// Record ids in result order; file hits are skipped.
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().filter_map(|h| h.record_id()).collect()
    }
}

/// Where a hit came from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HitSource {
    Record { id: String },
    File { path: PathBuf },
}

/// Record or file with relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub source: HitSource,
    pub title: String,
    pub score: f32,
    pub matched_fields: Vec<Field>,
    pub snippet: Option<String>,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl SearchHit {
    pub fn record_id(&self) -> Option<&str> {
        match &self.source {
            HitSource::Record { id } => Some(id),
            HitSource::File { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match &self.source {
            HitSource::File { path } => Some(path),
            HitSource::Record { .. } => None,
        }
    }
}

/// Relevance order: score descending, then title, then source.
pub fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.source.cmp(&b.source))
}

/// Sort by relevance, then re-sort by `sort_by`. The second sort is stable so
/// ties keep their relevance order.
pub fn sort_hits(hits: &mut [SearchHit], sort_by: SortBy) {
    hits.sort_by(compare_hits);
    match sort_by {
        SortBy::Relevance => {}
        SortBy::Title => hits.sort_by(|a, b| a.title.cmp(&b.title)),
        SortBy::Date => hits.sort_by(|a, b| b.modified.cmp(&a.modified)),
        SortBy::Size => hits.sort_by(|a, b| b.size.cmp(&a.size)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hit(id: &str, title: &str, score: f32) -> SearchHit {
        SearchHit {
            source: HitSource::Record { id: id.to_string() },
            title: title.to_string(),
            score,
            matched_fields: vec![Field::Title],
            snippet: None,
            modified: Utc::now(),
            size: title.len() as u64,
        }
    }

    #[test]
    fn ties_break_on_title_then_id() {
        let mut hits = vec![hit("B", "Beta", 5.0), hit("A2", "Alpha", 5.0), hit("A1", "Alpha", 5.0), hit("C", "Zeta", 9.0)];
        sort_hits(&mut hits, SortBy::Relevance);
        let ids: Vec<_> = hits.iter().filter_map(|h| h.record_id()).collect();
        assert_eq!(ids, vec!["C", "A1", "A2", "B"]);
    }

    #[test]
    fn date_and_size_sort_descending() {
        let mut old = hit("A", "short", 1.0);
        old.modified = Utc::now() - Duration::days(1);
        let new = hit("B", "a much longer title", 1.0);

        let mut hits = vec![old.clone(), new.clone()];
        sort_hits(&mut hits, SortBy::Date);
        assert_eq!(hits[0].record_id(), Some("B"));

        let mut hits = vec![old, new];
        sort_hits(&mut hits, SortBy::Size);
        assert_eq!(hits[0].record_id(), Some("B"));
    }

    #[test]
    fn records_order_before_files_on_full_tie() {
        let mut file = hit("x", "Same", 1.0);
        file.source = HitSource::File { path: PathBuf::from("/docs/same.md") };
        let mut hits = vec![file, hit("R", "Same", 1.0)];
        sort_hits(&mut hits, SortBy::Relevance);
        assert_eq!(hits[0].record_id(), Some("R"));
        assert!(hits[1].path().is_some());
    }
}
