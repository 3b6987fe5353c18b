use parking_lot::RwLock;
use crate::core::error::Result;
use crate::core::types::MetadataRecord;
use crate::storage::backend::{LoadReport, PersistenceBackend, RawRow, StoreLock};

/// Process-local backend; writers are already serialized by the record store.
#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<Vec<MetadataRecord>>,
    unparsed: RwLock<Vec<RawRow>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<MetadataRecord>) -> Self {
        MemoryBackend {
            records: RwLock::new(records),
            unparsed: RwLock::new(Vec::new()),
        }
    }
}

impl PersistenceBackend for MemoryBackend {
    fn load(&self) -> Result<LoadReport> {
        let unparsed = self.unparsed.read().clone();
        Ok(LoadReport {
            records: self.records.read().clone(),
            skipped_rows: unparsed.len(),
            unparsed,
        })
    }

    fn save(&self, records: &[MetadataRecord], unparsed: &[RawRow]) -> Result<()> {
        *self.records.write() = records.to_vec();
        *self.unparsed.write() = unparsed.to_vec();
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock> {
        Ok(StoreLock::Process)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
