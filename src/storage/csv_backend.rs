use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use crate::core::error::{Error, Result};
use crate::core::types::{Field, MetadataRecord};
use crate::storage::backend::{LoadReport, PersistenceBackend, RawRow, StoreLock};
use crate::storage::file_lock::FileLock;

/// Column order of the backing file
pub const COLUMNS: [&str; 13] = [
    "id", "title", "who", "what", "where", "when", "why", "how", "purpose", "key",
    "related_ids", "created_at", "updated_at",
];

static RELATED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("static pattern"));

/// CSV file with a header row and a `.lock` sidecar
pub struct CsvBackend {
    pub path: PathBuf,
    pub lock_path: PathBuf,
    pub lock_timeout: Duration,
    pub lock_retry: Duration,
}

impl CsvBackend {
    /// Open (creating if missing) the CSV file at `path`.
    pub fn open(path: impl Into<PathBuf>, lock_timeout: Duration, lock_retry: Duration) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let backend = CsvBackend {
            lock_path: FileLock::lock_path(&path),
            path,
            lock_timeout,
            lock_retry,
        };

        // create_new so a concurrent opener never truncates rows another handle wrote
        match OpenOptions::new().write(true).create_new(true).open(&backend.path) {
            Ok(file) => {
                let mut writer = WriterBuilder::new().from_writer(file);
                writer.write_record(COLUMNS)?;
                writer.flush()?;
                debug!(path = %backend.path.display(), "created empty header store");
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }

        Ok(backend)
    }

    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::StoreCorrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    }
}

impl PersistenceBackend for CsvBackend {
    fn load(&self) -> Result<LoadReport> {
        let metadata = fs::metadata(&self.path).map_err(|e| self.corrupt(e.to_string()))?;
        if metadata.len() == 0 {
            return Ok(LoadReport::default());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.corrupt(e.to_string()))?;

        let header = reader.headers().map_err(|e| self.corrupt(e.to_string()))?.clone();
        if header.len() != COLUMNS.len() || header.iter().zip(COLUMNS).any(|(got, want)| got.trim() != want) {
            return Err(self.corrupt(format!(
                "unexpected header row: {}",
                header.iter().collect::<Vec<_>>().join(",")
            )));
        }

        let mut report = LoadReport::default();
        for (line, row) in reader.byte_records().enumerate() {
            // An unreadable row cannot be written back; fail the load
            let row = row.map_err(|e| self.corrupt(e.to_string()))?;
            let parsed = StringRecord::from_byte_record(row.clone())
                .map_err(|e| e.to_string())
                .and_then(|row| parse_row(&row, header.len()));
            match parsed {
                Ok(record) => report.records.push(record),
                Err(reason) => {
                    report.skipped_rows += 1;
                    report.unparsed.push(row.iter().map(<[u8]>::to_vec).collect());
                    warn!(path = %self.path.display(), row = line + 1, %reason, "skipping malformed row");
                }
            }
        }

        Ok(report)
    }

    fn save(&self, records: &[MetadataRecord], unparsed: &[RawRow]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        {
            // Kept malformed rows may have any column count
            let mut writer = WriterBuilder::new().flexible(true).from_writer(&mut tmp);
            writer.write_record(COLUMNS)?;
            for record in records {
                writer.write_record(to_row(record))?;
            }
            for row in unparsed {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock> {
        FileLock::acquire(&self.lock_path, self.lock_timeout, self.lock_retry).map(StoreLock::File)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

fn parse_row(row: &StringRecord, expected: usize) -> std::result::Result<MetadataRecord, String> {
    if row.len() != expected {
        return Err(format!("expected {} columns, found {}", expected, row.len()));
    }
    let col = |i: usize| row.get(i).unwrap_or("").to_string();

    let id = col(0);
    if id.trim().is_empty() {
        return Err("empty id".to_string());
    }

    let mut record = MetadataRecord::new(&id, &col(1), &col(2));
    for (i, field) in Field::ALL.iter().enumerate().skip(2) {
        *record.field_mut(*field) = col(i + 1);
    }
    record.related_ids = parse_related_ids(&col(10));
    record.created_at = parse_timestamp(&col(11))?;
    record.updated_at = parse_timestamp(&col(12))?;
    Ok(record)
}

fn to_row(record: &MetadataRecord) -> Vec<String> {
    let mut row = Vec::with_capacity(COLUMNS.len());
    row.push(record.id.clone());
    for field in Field::ALL {
        row.push(record.field(field).to_string());
    }
    row.push(format_related_ids(&record.related_ids));
    row.push(record.created_at.to_rfc3339());
    row.push(record.updated_at.to_rfc3339());
    row
}

/// `[A1] [B2]` -> `["A1", "B2"]`
pub fn parse_related_ids(value: &str) -> Vec<String> {
    RELATED_ID
        .captures_iter(value)
        .map(|caps| caps[1].trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

pub fn format_related_ids(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("[{}]", id))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp '{}': {}", value, e))
}
