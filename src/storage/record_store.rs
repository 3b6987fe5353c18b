use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use chrono::Utc;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{info, warn};
use crate::core::config::DuplicatePolicy;
use crate::core::error::{Error, Result};
use crate::core::types::{MetadataRecord, RecordPatch};
use crate::storage::backend::{LoadReport, PersistenceBackend};

/// Pre-write approval hook for externally enforced content rules.
pub trait WriteGate: Send + Sync {
    fn allowed(&self, record: &MetadataRecord) -> bool;
}

/// Gate that approves every write
pub struct AllowAll;

impl WriteGate for AllowAll {
    fn allowed(&self, _record: &MetadataRecord) -> bool {
        true
    }
}

impl<F> WriteGate for F
where
    F: Fn(&MetadataRecord) -> bool + Send + Sync,
{
    fn allowed(&self, record: &MetadataRecord) -> bool {
        self(record)
    }
}

/// Authoritative record set.
///
/// Writes run one at a time: writer mutex, then the backend lock, then a
/// fresh load, the change, a save, and finally the swap of the committed
/// snapshot. Readers only ever see a fully committed `Arc<Vec<_>>`.
pub struct RecordStore {
    backend: Box<dyn PersistenceBackend>,
    gate: Box<dyn WriteGate>,
    policy: DuplicatePolicy,
    lock_timeout: Duration,
    writer: Mutex<()>,
    committed: RwLock<Arc<Vec<MetadataRecord>>>,
    generation: AtomicU64,
    skipped_rows: AtomicUsize,
}

impl RecordStore {
    pub fn open(
        backend: Box<dyn PersistenceBackend>,
        policy: DuplicatePolicy,
        lock_timeout: Duration,
    ) -> Result<Self> {
        let store = RecordStore {
            backend,
            gate: Box::new(AllowAll),
            policy,
            lock_timeout,
            writer: Mutex::new(()),
            committed: RwLock::new(Arc::new(Vec::new())),
            generation: AtomicU64::new(0),
            skipped_rows: AtomicUsize::new(0),
        };
        store.refresh()?;
        Ok(store)
    }

    pub fn with_gate(mut self, gate: Box<dyn WriteGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Re-read the backing store and publish what it holds.
    pub fn refresh(&self) -> Result<Arc<Vec<MetadataRecord>>> {
        let _writer = self.lock_writer()?;
        let report = self.backend.load()?;
        let skipped = report.skipped_rows;
        let records = dedupe(report);
        info!(
            backend = %self.backend.describe(),
            records = records.len(),
            skipped_rows = skipped,
            "loaded header records"
        );
        self.skipped_rows.store(skipped, Ordering::Relaxed);
        Ok(self.publish(records))
    }

    /// Committed snapshot; unaffected by later writes.
    pub fn all(&self) -> Arc<Vec<MetadataRecord>> {
        self.committed.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<MetadataRecord> {
        self.committed.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.committed.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped every time a new snapshot is published
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows.load(Ordering::Relaxed)
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Insert `record`, or replace it under `DuplicatePolicy::Upsert`.
    pub fn add(&self, record: MetadataRecord) -> Result<String> {
        let mut record = record.sanitize()?;
        if !self.gate.allowed(&record) {
            return Err(Error::Rejected(record.id));
        }
        let id = record.id.clone();
        let policy = self.policy;

        self.write(|records| {
            let now = Utc::now();
            record.updated_at = now;
            match records.iter().position(|r| r.id == record.id) {
                Some(_) if policy == DuplicatePolicy::Reject => {
                    Err(Error::DuplicateId(record.id.clone()))
                }
                Some(i) => {
                    record.created_at = records[i].created_at;
                    records[i] = record;
                    Ok(((), true))
                }
                None => {
                    record.created_at = now;
                    records.push(record);
                    Ok(((), true))
                }
            }
        })?;

        info!(%id, "record stored");
        Ok(id)
    }

    /// Returns `false`, without writing, when the patch changes nothing.
    pub fn update(&self, id: &str, patch: &RecordPatch) -> Result<bool> {
        let changed = self.write(|records| {
            let i = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;

            let Some(patched) = patch.apply(&records[i]) else {
                return Ok((false, false));
            };
            let mut patched = patched.sanitize()?;
            if !self.gate.allowed(&patched) {
                return Err(Error::Rejected(id.to_string()));
            }
            patched.updated_at = Utc::now();
            records[i] = patched;
            Ok((true, true))
        })?;

        if changed {
            info!(%id, "record updated");
        }
        Ok(changed)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        self.write(|records| {
            let i = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            records.remove(i);
            Ok((true, true))
        })?;

        info!(%id, "record deleted");
        Ok(true)
    }

    /// One read-modify-write cycle. `apply` returns its output plus whether
    /// the records must be saved.
    fn write<T>(
        &self,
        apply: impl FnOnce(&mut Vec<MetadataRecord>) -> Result<(T, bool)>,
    ) -> Result<T> {
        let _writer = self.lock_writer()?;
        let _lock = self.backend.lock()?;

        // Another process may have written since our last load
        let mut report = self.backend.load()?;
        self.skipped_rows.store(report.skipped_rows, Ordering::Relaxed);
        let unparsed = std::mem::take(&mut report.unparsed);
        let mut records = dedupe(report);

        let (output, dirty) = apply(&mut records)?;
        if dirty {
            self.backend.save(&records, &unparsed)?;
        }

        let stale = records != **self.committed.read();
        if dirty || stale {
            self.publish(records);
        }
        Ok(output)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        let start = Instant::now();
        self.writer
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| Error::LockTimeout {
                resource: format!("{} writer", self.backend.describe()),
                waited: start.elapsed(),
            })
    }

    fn publish(&self, records: Vec<MetadataRecord>) -> Arc<Vec<MetadataRecord>> {
        let records = Arc::new(records);
        *self.committed.write() = records.clone();
        self.generation.fetch_add(1, Ordering::AcqRel);
        records
    }
}

/// Keep the last row for each id, at the position of its first occurrence.
fn dedupe(report: LoadReport) -> Vec<MetadataRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut records: Vec<MetadataRecord> = Vec::with_capacity(report.records.len());
    let mut duplicates = 0usize;

    for record in report.records {
        match positions.get(&record.id) {
            Some(&i) => {
                duplicates += 1;
                records[i] = record;
            }
            None => {
                positions.insert(record.id.clone(), records.len());
                records.push(record);
            }
        }
    }

    if duplicates > 0 {
        warn!(duplicates, "backing store holds repeated ids; last row wins");
    }
    records
}
