use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;
use crate::analysis::tokenizer::{normalize_phrase, MIN_TOKEN_LENGTH, PUNCTUATION};
use crate::core::config::ContentConfig;
use crate::core::error::Result;
use crate::search::results::{HitSource, SearchHit};
use crate::search::snippet::{extract_snippet, phrase_matcher};

/// Points per occurrence of a query word in file content
pub const OCCURRENCE_POINTS: f32 = 2.0;

/// Added once when the whole query appears verbatim
pub const CONTENT_PHRASE_BONUS: f32 = 10.0;

/// Outcome of one directory scan
#[derive(Debug, Clone, Default)]
pub struct ContentScan {
    pub hits: Vec<SearchHit>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub budget_exhausted: bool,
}

/// Substring search over raw file contents under a root directory.
#[derive(Debug, Clone)]
pub struct ContentScanner {
    config: ContentConfig,
    extensions: Vec<String>,
}

impl ContentScanner {
    pub fn new(config: ContentConfig) -> Self {
        let extensions = config
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        ContentScanner { config, extensions }
    }

    pub fn root(&self) -> Option<&Path> {
        self.config.root.as_deref()
    }

    /// Scan the configured root; no root means no hits. A non-empty
    /// `file_types` narrows the extension allow-list for this scan.
    pub fn scan(&self, query: &str, file_types: &[String]) -> Result<ContentScan> {
        match self.root() {
            Some(root) => self.scan_root(root, query, file_types),
            None => Ok(ContentScan::default()),
        }
    }

    pub fn scan_root(&self, root: &Path, query: &str, file_types: &[String]) -> Result<ContentScan> {
        let phrase = normalize_phrase(query);
        if phrase.is_empty() {
            return Ok(ContentScan::default());
        }
        let walk = self.collect_files(root, file_types)?;
        let mut scan = self.scan_files(&walk.files, &phrase)?;
        scan.files_skipped += walk.unreadable;
        scan.budget_exhausted |= walk.truncated;

        debug!(
            root = %root.display(),
            files = walk.files.len(),
            hits = scan.hits.len(),
            skipped = scan.files_skipped,
            "content scan finished"
        );
        Ok(scan)
    }

    /// Read `files` in parallel and keep the ones containing `phrase`.
    fn scan_files(&self, files: &[PathBuf], phrase: &str) -> Result<ContentScan> {
        let matcher = phrase_matcher(phrase)?;
        let deadline = self.config.time_budget().map(|budget| Instant::now() + budget);
        let skipped = AtomicUsize::new(0);
        let scanned = AtomicUsize::new(0);

        let hits: Vec<SearchHit> = files
            .par_iter()
            .filter_map(|path| {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                match self.scan_file(path, phrase, &matcher) {
                    Ok(hit) => {
                        scanned.fetch_add(1, Ordering::Relaxed);
                        hit
                    }
                    Err(e) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        warn!(path = %path.display(), error = %e, "skipping unreadable file");
                        None
                    }
                }
            })
            .collect();

        let files_skipped = skipped.into_inner();
        Ok(ContentScan {
            hits,
            files_scanned: scanned.into_inner(),
            files_skipped,
            budget_exhausted: deadline.is_some_and(|d| Instant::now() >= d) && files_skipped > 0,
        })
    }

    /// Eligible files in sorted walk order, capped by `max_files`.
    fn collect_files(&self, root: &Path, file_types: &[String]) -> Result<Walk> {
        // Surface a missing root as an error instead of an empty walk
        fs::metadata(root)?;

        let mut walk = Walk::default();
        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    walk.unreadable += 1;
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !self.is_eligible(path) || !has_file_type(path, file_types) {
                continue;
            }
            if self.config.max_files.is_some_and(|max| walk.files.len() >= max) {
                walk.truncated = true;
                break;
            }
            walk.files.push(entry.into_path());
        }

        Ok(walk)
    }

    pub fn is_eligible(&self, path: &Path) -> bool {
        !self.extensions.is_empty() && has_file_type(path, &self.extensions)
    }

    fn scan_file(&self, path: &Path, query: &str, matcher: &Regex) -> Result<Option<SearchHit>> {
        let bytes = fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);

        let Some(found) = matcher.find(&content) else {
            return Ok(None);
        };

        let metadata = fs::metadata(path)?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let snippet = extract_snippet(&content, found.start(), self.config.snippet_length);
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Some(SearchHit {
            source: HitSource::File { path: path.to_path_buf() },
            title,
            score: score_content(&content, query),
            matched_fields: Vec::new(),
            snippet: Some(snippet.text),
            modified,
            size: metadata.len(),
        }))
    }
}

#[derive(Default)]
struct Walk {
    files: Vec<PathBuf>,
    unreadable: usize,
    truncated: bool,
}

/// Extension check against lowercase, dot-less `types`; empty `types` allows all.
fn has_file_type(path: &Path, types: &[String]) -> bool {
    if types.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| types.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

/// Frequency score of `query` inside `content`: two points per occurrence of
/// each query word, plus a bonus when the whole phrase is present.
pub fn score_content(content: &str, query: &str) -> f32 {
    let query = normalize_phrase(query);
    if query.is_empty() {
        return 0.0;
    }
    let content = normalize_phrase(content);

    let mut score = 0.0;
    for word in query.split(' ') {
        let word = word.trim_matches(PUNCTUATION);
        if word.chars().count() < MIN_TOKEN_LENGTH {
            continue;
        }
        score += content.matches(word).count() as f32 * OCCURRENCE_POINTS;
    }
    if content.contains(&query) {
        score += CONTENT_PHRASE_BONUS;
    }
    score
}
