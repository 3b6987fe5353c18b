use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use crate::core::error::{Error, Result};
use crate::query::types::SearchOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub options: SearchOptions,
    pub timestamp: DateTime<Utc>,
}

/// Bounded log of past searches, optionally mirrored to a JSON file.
pub struct SearchHistory {
    entries: Mutex<VecDeque<HistoryEntry>>,
    limit: usize,
    path: Option<PathBuf>,
}

impl SearchHistory {
    pub fn new(limit: usize) -> Self {
        SearchHistory {
            entries: Mutex::new(VecDeque::new()),
            limit: limit.max(1),
            path: None,
        }
    }

    /// Load the file at `path` if it exists. An unparsable file is logged and
    /// replaced on the next save.
    pub fn open(path: &Path, limit: usize) -> Result<Self> {
        let mut history = SearchHistory::new(limit);
        history.path = Some(path.to_path_buf());

        if path.exists() {
            let content = fs::read_to_string(path)?;
            match serde_json::from_str::<Vec<HistoryEntry>>(&content) {
                Ok(entries) => {
                    let skip = entries.len().saturating_sub(history.limit);
                    history.entries.get_mut().extend(entries.into_iter().skip(skip));
                    debug!(path = %path.display(), entries = history.len(), "loaded search history");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable search history");
                }
            }
        }

        Ok(history)
    }

    pub fn record(&self, query: &str, options: &SearchOptions) {
        let mut entries = self.entries.lock();
        entries.push_back(HistoryEntry {
            query: query.to_string(),
            options: options.clone(),
            timestamp: Utc::now(),
        });
        while entries.len() > self.limit {
            entries.pop_front();
        }

        // Saved under the lock so the newest list is always the last one written
        if let Some(path) = &self.path {
            if let Err(e) = save(path, entries.make_contiguous()) {
                warn!(path = %path.display(), error = %e, "failed to save search history");
            }
        }
    }

    /// Past queries containing `partial` (case-insensitive), newest first,
    /// without repeats.
    pub fn matching(&self, partial: &str) -> Vec<String> {
        let needle = partial.to_lowercase();
        let mut seen = Vec::new();
        for entry in self.entries.lock().iter().rev() {
            if entry.query.to_lowercase().contains(&needle) && !seen.contains(&entry.query) {
                seen.push(entry.query.clone());
            }
        }
        seen
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write to a temp file in the same directory, then rename over `path`.
fn save(path: &Path, entries: &[HistoryEntry]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_to_limit() {
        let history = SearchHistory::new(2);
        for query in ["one", "two", "three"] {
            history.record(query, &SearchOptions::default());
        }
        let queries: Vec<_> = history.entries().into_iter().map(|e| e.query).collect();
        assert_eq!(queries, vec!["two", "three"]);
    }

    #[test]
    fn matching_is_newest_first_and_unique() {
        let history = SearchHistory::new(10);
        for query in ["Search engine", "index", "search tips", "search engine"] {
            history.record(query, &SearchOptions::default());
        }
        assert_eq!(
            history.matching("SEARCH"),
            vec!["search engine", "search tips", "Search engine"]
        );
    }

    #[test]
    fn persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let history = SearchHistory::open(&path, 10).unwrap();
        history.record("wolfie", &SearchOptions::default().with_limit(3));
        drop(history);

        let reopened = SearchHistory::open(&path, 10).unwrap();
        let entries = reopened.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query, "wolfie");
        assert_eq!(entries[0].options.limit, 3);
    }

    #[test]
    fn garbage_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();
        assert!(SearchHistory::open(&path, 10).unwrap().is_empty());
    }

    #[test]
    fn concurrent_records_leave_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let history = SearchHistory::open(&path, 50).unwrap();

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let history = &history;
                scope.spawn(move || {
                    for i in 0..10 {
                        history.record(&format!("query {} {}", writer, i), &SearchOptions::default());
                    }
                });
            }
        });

        let reopened = SearchHistory::open(&path, 50).unwrap();
        assert_eq!(reopened.len(), 40);
        let queries = |h: &SearchHistory| h.entries().into_iter().map(|e| e.query).collect::<Vec<_>>();
        assert_eq!(queries(&reopened), queries(&history));
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
