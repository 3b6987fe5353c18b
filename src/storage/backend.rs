use crate::core::error::Result;
use crate::core::types::MetadataRecord;
use crate::storage::file_lock::FileLock;

/// Fields of a row that did not parse, kept byte for byte
pub type RawRow = Vec<Vec<u8>>;

/// Outcome of reading the backing store
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<MetadataRecord>,
    pub skipped_rows: usize,
    /// Skipped rows, to be handed back to `save` so a write never drops them
    pub unparsed: Vec<RawRow>,
}

/// Held for the duration of one read-modify-write cycle.
pub enum StoreLock {
    File(FileLock),
    Process,
}

/// Persistence strategy behind the record store.
///
/// `lock` must be taken before `load`/`save` on the write path; `load` alone
/// is allowed for readers.
pub trait PersistenceBackend: Send + Sync {
    fn load(&self) -> Result<LoadReport>;

    /// Replace the persisted contents with `records`, followed by the
    /// `unparsed` rows exactly as they were loaded.
    fn save(&self, records: &[MetadataRecord], unparsed: &[RawRow]) -> Result<()>;

    fn lock(&self) -> Result<StoreLock>;

    /// Human-readable location for logs and stats
    fn describe(&self) -> String;
}
