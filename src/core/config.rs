use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::Field;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub lock_timeout_secs: u64,
    pub lock_retry_ms: u64,
    pub duplicate_policy: DuplicatePolicy,

    pub cache_capacity: usize,
    pub default_limit: usize,

    pub history_path: Option<PathBuf>,
    pub history_limit: usize,

    pub scoring: ScoringConfig,
    pub content: ContentConfig,
}

/// What `add` does with an id that is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Upsert,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: FieldWeights,
    pub phrase_bonus: f32,
}

/// Per-field importance used at scoring time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub title: f32,
    pub who: f32,
    pub what: f32,
    pub r#where: f32,
    pub when: f32,
    pub why: f32,
    pub how: f32,
    pub purpose: f32,
    pub key: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub root: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub snippet_length: usize,
    pub max_files: Option<usize>,
    pub time_budget_ms: Option<u64>,
    pub follow_links: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: PathBuf::from("./data/headers.csv"),
            lock_timeout_secs: 30,
            lock_retry_ms: 100,
            duplicate_policy: DuplicatePolicy::Upsert,

            cache_capacity: 100,
            default_limit: 25,

            history_path: None,
            history_limit: 100,

            scoring: ScoringConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            weights: FieldWeights::default(),
            phrase_bonus: 10.0,
        }
    }
}

impl Default for FieldWeights {
    fn default() -> Self {
        FieldWeights {
            title: 10.0,
            who: 8.0,
            what: 9.0,
            r#where: 6.0,
            when: 5.0,
            why: 7.0,
            how: 7.0,
            purpose: 8.0,
            key: 9.0,
        }
    }
}

impl FieldWeights {
    pub fn weight(&self, field: Field) -> f32 {
        match field {
            Field::Title => self.title,
            Field::Who => self.who,
            Field::What => self.what,
            Field::Where => self.r#where,
            Field::When => self.when,
            Field::Why => self.why,
            Field::How => self.how,
            Field::Purpose => self.purpose,
            Field::Key => self.key,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            root: None,
            extensions: [".md", ".txt", ".php", ".html", ".css", ".js", ".json", ".csv"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            snippet_length: 200,
            max_files: None,
            time_budget_ms: None,
            follow_links: false,
        }
    }
}

impl ContentConfig {
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }
}

impl Config {
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms.max(1))
    }

    /// Read a TOML file; missing keys fall back to defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache_capacity must be >= 1".to_string()));
        }
        if self.default_limit == 0 {
            return Err(Error::Config("default_limit must be >= 1".to_string()));
        }
        if self.history_limit == 0 {
            return Err(Error::Config("history_limit must be >= 1".to_string()));
        }
        if self.content.snippet_length == 0 {
            return Err(Error::Config("content.snippet_length must be >= 1".to_string()));
        }
        if self.scoring.phrase_bonus < 0.0 {
            return Err(Error::Config("scoring.phrase_bonus must be >= 0".to_string()));
        }
        if let Some(field) = Field::ALL
            .iter()
            .find(|f| self.scoring.weights.weight(**f) < 0.0)
        {
            return Err(Error::Config(format!("scoring.weights.{} must be >= 0", field)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_rank_title_highest_and_when_lowest() {
        let weights = FieldWeights::default();
        let max = Field::ALL.iter().map(|f| weights.weight(*f)).fold(f32::MIN, f32::max);
        let min = Field::ALL.iter().map(|f| weights.weight(*f)).fold(f32::MAX, f32::min);
        assert_eq!(weights.weight(Field::Title), max);
        assert_eq!(weights.weight(Field::When), min);
    }

    #[test]
    fn toml_overrides_selected_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
store_path = "/tmp/headers.csv"
duplicate_policy = "reject"
cache_capacity = 8

[scoring]
phrase_bonus = 4.0

[scoring.weights]
where = 1.5

[content]
root = "/srv/docs"
extensions = [".md"]
"#
        )
        .unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/headers.csv"));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.scoring.phrase_bonus, 4.0);
        assert_eq!(config.scoring.weights.weight(Field::Where), 1.5);
        assert_eq!(config.scoring.weights.weight(Field::Title), 10.0);
        assert_eq!(config.content.extensions, vec![".md".to_string()]);
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = Config {
            cache_capacity: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = Config::from_toml_file(Path::new("/nonexistent/headerdex.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unparsable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("headerdex.toml");
        std::fs::write(&path, "cache_capacity = \"lots\"\n[content\n").unwrap();

        let err = Config::from_toml_file(&path).unwrap_err();
        assert!(matches!(&err, Error::Config(msg) if msg.contains("failed to parse")));
    }
}
