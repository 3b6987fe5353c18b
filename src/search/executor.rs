use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use roaring::RoaringBitmap;
use crate::analysis::tokenizer::{normalize_phrase, FieldTokenizer, Tokenizer};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::{Field, RecordHandle};
use crate::mvcc::controller::Snapshot;
use crate::query::cache::{CachedResultSet, QueryKey, ResultCache};
use crate::query::types::SearchOptions;
use crate::scoring::scorer::{FieldMatch, Scorer, WeightedFieldScorer};
use crate::search::content::ContentScanner;
use crate::search::results::{sort_hits, HitSource, SearchHit, SearchResults};

/// Execute searches against a snapshot, with caching
pub struct QueryEngine {
    pub tokenizer: Box<dyn Tokenizer>,
    pub scorer: Box<dyn Scorer>,
    pub cache: ResultCache,
    pub content: ContentScanner,
    search_count: AtomicU64,
}

impl QueryEngine {
    pub fn new(config: &Config) -> Self {
        QueryEngine {
            tokenizer: Box::new(FieldTokenizer::default()),
            scorer: Box::new(WeightedFieldScorer::new(&config.scoring)),
            cache: ResultCache::new(config.cache_capacity),
            content: ContentScanner::new(config.content.clone()),
            search_count: AtomicU64::new(0),
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn search_count(&self) -> u64 {
        self.search_count.load(Ordering::Relaxed)
    }

    pub fn execute(&self, snapshot: &Snapshot, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        options.validate()?;
        let start = Instant::now();
        self.search_count.fetch_add(1, Ordering::Relaxed);

        let tokens = self.query_tokens(query);
        if tokens.is_empty() {
            return Ok(SearchResults::empty(query));
        }
        let phrase = normalize_phrase(query);

        let key = QueryKey {
            snapshot_version: snapshot.version,
            query: phrase.clone(),
            field_scope: options.field_scope,
            limit: options.limit,
            sort_by: options.sort_by,
            include_content: options.include_content,
            file_types: options.file_types.clone(),
        };

        if let Some(cached) = self.cache.get(&key) {
            return Ok(SearchResults {
                query: query.to_string(),
                hits: cached.hits,
                total_hits: cached.total_hits,
                took_ms: start.elapsed().as_millis() as u64,
                from_cache: true,
            });
        }

        let fields = options.field_scope.fields();
        let mut hits = self.match_records(snapshot, &tokens, &phrase, &fields);

        if options.include_content && self.content.root().is_some() {
            hits.extend(self.content.scan(&phrase, &options.file_types)?.hits);
        }

        sort_hits(&mut hits, options.sort_by);
        let total_hits = hits.len();
        hits.truncate(options.limit);

        self.cache.put(key, CachedResultSet::new(hits.clone(), total_hits));

        Ok(SearchResults {
            query: query.to_string(),
            hits,
            total_hits,
            took_ms: start.elapsed().as_millis() as u64,
            from_cache: false,
        })
    }

    /// Distinct query tokens in first-seen order
    pub fn query_tokens(&self, query: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tokenizer
            .tokenize(query)
            .into_iter()
            .map(|token| token.text)
            .filter(|text| seen.insert(text.clone()))
            .collect()
    }

    /// Score every record that shares a token with the query, or holds the
    /// whole phrase, in one of `fields`.
    pub fn match_records(&self, snapshot: &Snapshot, tokens: &[String], phrase: &str, fields: &[Field]) -> Vec<SearchHit> {
        let mut candidates = RoaringBitmap::new();
        for token in tokens {
            candidates |= snapshot.index.lookup_any(fields, token);
        }
        if !phrase.is_empty() {
            for (position, record) in snapshot.records.iter().enumerate() {
                if fields.iter().any(|f| contains_phrase(record.field(*f), phrase)) {
                    candidates.insert(position as u32);
                }
            }
        }

        let mut hits = Vec::with_capacity(candidates.len() as usize);
        for raw in candidates.iter() {
            let handle = RecordHandle(raw);
            let Some(record) = snapshot.record(handle) else {
                continue;
            };

            let matches: Vec<FieldMatch> = fields
                .iter()
                .map(|field| FieldMatch {
                    field: *field,
                    matched_tokens: tokens
                        .iter()
                        .filter(|token| snapshot.index.contains(*field, token, handle))
                        .count(),
                    phrase: contains_phrase(record.field(*field), phrase),
                })
                .filter(FieldMatch::is_match)
                .collect();

            if matches.is_empty() {
                continue;
            }

            hits.push(SearchHit {
                source: HitSource::Record { id: record.id.clone() },
                title: record.title.clone(),
                score: self.scorer.score(&matches),
                matched_fields: matches.iter().map(|m| m.field).collect(),
                snippet: None,
                modified: record.updated_at,
                size: record.size(),
            });
        }

        hits
    }
}

fn contains_phrase(value: &str, phrase: &str) -> bool {
    !value.is_empty() && normalize_phrase(value).contains(phrase)
}
