//! Durable queue of pending reports
//!
//! ## Architecture
//!
//! The queue is an ordered list of [`ReportRecord`]s serialized as a single
//! JSON array under one well-known key in a [`StorageMedium`]. Every
//! mutation is a full read-modify-write of that array; the medium's atomic
//! overwrite guarantees a restart sees either the pre-mutation or the
//! post-mutation queue, never a truncated parse.
//!
//! Insertion order is submission order and is what the sync engine drains
//! in, so this module never reorders records. Records are keyed by id:
//! appending a duplicate id is an error, removing an absent id is not.
//!
//! All operations are synchronous. An internal lock serializes the
//! read-modify-write sequences so interleaved callers cannot lose updates.

mod medium;

pub use medium::{MemoryMedium, SqliteMedium, StorageMedium};

use crate::error::{Error, Result};
use crate::types::ReportRecord;
use std::path::PathBuf;
use std::sync::Mutex;

/// Well-known key the serialized queue lives under
const QUEUE_KEY: &str = "pending_reports";

/// Restart-surviving, ordered store of pending reports
pub struct QueueStore {
    medium: Box<dyn StorageMedium>,
    op_lock: Mutex<()>,
}

impl QueueStore {
    /// Open or create the queue database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        Ok(Self::with_medium(Box::new(SqliteMedium::open(path)?)))
    }

    /// Open an in-memory queue (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::with_medium(Box::new(SqliteMedium::open_in_memory()?)))
    }

    /// Build a queue over any storage medium
    pub fn with_medium(medium: Box<dyn StorageMedium>) -> Self {
        Self {
            medium,
            op_lock: Mutex::new(()),
        }
    }

    /// Append a record to the end of the queue.
    ///
    /// Fails with [`Error::DuplicateId`] if a record with the same id is
    /// already queued; the stored queue is left untouched in that case.
    pub fn append(&self, record: &ReportRecord) -> Result<()> {
        let _guard = self.op_lock.lock().unwrap();
        let mut records = self.load()?;

        if records.iter().any(|queued| queued.id == record.id) {
            return Err(Error::DuplicateId(record.id.clone()));
        }

        records.push(record.clone());
        self.save(&records)
    }

    /// All queued records, oldest first
    pub fn list(&self) -> Result<Vec<ReportRecord>> {
        let _guard = self.op_lock.lock().unwrap();
        self.load()
    }

    /// Remove the record with the given id, if present.
    ///
    /// Idempotent: removing an id that is not queued succeeds and changes
    /// nothing.
    pub fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.op_lock.lock().unwrap();
        let mut records = self.load()?;

        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Ok(());
        }

        self.save(&records)
    }

    /// Drop every queued record.
    ///
    /// Administrative operation; the normal path removes records one at a
    /// time as the collector acknowledges them.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.op_lock.lock().unwrap();
        self.medium.delete(QUEUE_KEY)
    }

    /// Number of queued records
    pub fn len(&self) -> Result<usize> {
        let _guard = self.op_lock.lock().unwrap();
        Ok(self.load()?.len())
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn load(&self) -> Result<Vec<ReportRecord>> {
        match self.medium.read(QUEUE_KEY)? {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[ReportRecord]) -> Result<()> {
        let payload = serde_json::to_string(records)?;
        self.medium.write(QUEUE_KEY, &payload)
    }
}
