use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::Field;

/// Which record fields a search looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldScope {
    #[default]
    All,
    One(Field),
}

impl FieldScope {
    pub fn fields(&self) -> Vec<Field> {
        match self {
            FieldScope::All => Field::ALL.to_vec(),
            FieldScope::One(field) => vec![*field],
        }
    }
}

impl fmt::Display for FieldScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldScope::All => f.write_str("all"),
            FieldScope::One(field) => write!(f, "{}", field),
        }
    }
}

impl FromStr for FieldScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(FieldScope::All);
        }
        s.parse::<Field>()
            .map(FieldScope::One)
            .map_err(|_| Error::InvalidOption(format!("unknown field scope '{}'", s)))
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Score descending, then title, then id
    #[default]
    Relevance,
    Title,   // A → Z
    Date,    // newest first
    Size,    // largest first
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortBy::Relevance => "relevance",
            SortBy::Title => "title",
            SortBy::Date => "date",
            SortBy::Size => "size",
        };
        f.write_str(name)
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "title" => Ok(SortBy::Title),
            "date" => Ok(SortBy::Date),
            "size" => Ok(SortBy::Size),
            other => Err(Error::InvalidOption(format!("unknown sort order '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub field_scope: FieldScope,
    pub limit: usize,
    pub sort_by: SortBy,
    pub include_content: bool,
    /// Extensions content hits are limited to; empty keeps every allowed type
    #[serde(default)]
    pub file_types: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            field_scope: FieldScope::All,
            limit: 25,
            sort_by: SortBy::Relevance,
            include_content: false,
            file_types: Vec::new(),
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_scope(mut self, scope: FieldScope) -> Self {
        self.field_scope = scope;
        self
    }

    pub fn with_sort(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_content(mut self, include_content: bool) -> Self {
        self.include_content = include_content;
        self
    }

    /// Accepts `"md"`, `".MD"` and the like.
    pub fn with_file_types(mut self, types: &[&str]) -> Self {
        self.file_types = types
            .iter()
            .map(|t| t.trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self.file_types.sort();
        self.file_types.dedup();
        self
    }

    /// Build options from their string forms, as they arrive from callers.
    pub fn parse(field_scope: &str, limit: usize, sort_by: &str, include_content: bool) -> Result<Self> {
        let options = SearchOptions {
            field_scope: field_scope.parse()?,
            limit,
            sort_by: sort_by.parse()?,
            include_content,
            file_types: Vec::new(),
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::InvalidOption("limit must be at least 1".to_string()));
        }
        Ok(())
    }
}
