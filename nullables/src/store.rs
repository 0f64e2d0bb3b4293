//! Nullable stores: thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use ember_store::{OnConflict, PendingReport, RecordStore, ReportStore, StoreError};
use ember_types::{BlockNumber, ChainRecord, UncleRecord};

/// An in-memory record cache.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullRecordStore {
    records: Mutex<HashMap<BlockNumber, ChainRecord>>,
    uncles: Mutex<HashMap<(BlockNumber, u32), UncleRecord>>,
    uncle_writes: Mutex<Vec<(BlockNumber, u32)>>,
    warned_overwrites: AtomicU32,
}

impl NullRecordStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            uncles: Mutex::new(HashMap::new()),
            uncle_writes: Mutex::new(Vec::new()),
            warned_overwrites: AtomicU32::new(0),
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// `(owner, index)` of every uncle write, in write order.
    pub fn uncle_writes(&self) -> Vec<(BlockNumber, u32)> {
        self.uncle_writes.lock().unwrap().clone()
    }

    /// Overwrites made with [`OnConflict::Warn`], i.e. unexpected re-fetches.
    pub fn warned_overwrites(&self) -> u32 {
        self.warned_overwrites.load(Ordering::SeqCst)
    }

    fn note_conflict(&self, existed: bool, on_conflict: OnConflict) {
        if existed && on_conflict == OnConflict::Warn {
            self.warned_overwrites.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Default for NullRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for NullRecordStore {
    fn put_record(&self, record: &ChainRecord, on_conflict: OnConflict) -> Result<(), StoreError> {
        let existed = self
            .records
            .lock()
            .unwrap()
            .insert(record.block.number, record.clone())
            .is_some();
        self.note_conflict(existed, on_conflict);
        Ok(())
    }

    fn get_record(&self, number: BlockNumber) -> Result<Option<ChainRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(&number).cloned())
    }

    fn put_uncle(&self, uncle: &UncleRecord, on_conflict: OnConflict) -> Result<(), StoreError> {
        let key = (uncle.owner, uncle.index);
        let existed = self
            .uncles
            .lock()
            .unwrap()
            .insert(key, uncle.clone())
            .is_some();
        self.uncle_writes.lock().unwrap().push(key);
        self.note_conflict(existed, on_conflict);
        Ok(())
    }

    fn get_uncle(&self, owner: BlockNumber, index: u32) -> Result<Option<UncleRecord>, StoreError> {
        Ok(self.uncles.lock().unwrap().get(&(owner, index)).cloned())
    }

    fn has_uncle(&self, owner: BlockNumber, index: u32) -> Result<bool, StoreError> {
        Ok(self.uncles.lock().unwrap().contains_key(&(owner, index)))
    }
}

/// An in-memory pending/published report queue.
pub struct NullReportStore {
    pending: Mutex<BTreeMap<String, PendingReport>>,
    published: Mutex<BTreeSet<String>>,
    pending_writes: Mutex<Vec<String>>,
}

impl NullReportStore {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            published: Mutex::new(BTreeSet::new()),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    /// Mark `label` as published without going through pending.
    pub fn insert_published(&self, label: &str) {
        self.published.lock().unwrap().insert(label.to_string());
    }

    /// Labels of every `write_pending` call, in call order (duplicates included).
    pub fn pending_writes(&self) -> Vec<String> {
        self.pending_writes.lock().unwrap().clone()
    }

    pub fn published_labels(&self) -> Vec<String> {
        self.published.lock().unwrap().iter().cloned().collect()
    }
}

impl Default for NullReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore for NullReportStore {
    fn is_published(&self, label: &str) -> Result<bool, StoreError> {
        Ok(self.published.lock().unwrap().contains(label))
    }

    fn write_pending(&self, report: &PendingReport) -> Result<(), StoreError> {
        self.pending_writes.lock().unwrap().push(report.label.clone());
        self.pending
            .lock()
            .unwrap()
            .insert(report.label.clone(), report.clone());
        Ok(())
    }

    fn pending_labels(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.pending.lock().unwrap().keys().cloned().collect())
    }

    fn read_pending(&self, label: &str) -> Result<Option<PendingReport>, StoreError> {
        Ok(self.pending.lock().unwrap().get(label).cloned())
    }

    fn publish(&self, label: &str) -> Result<(), StoreError> {
        if self.pending.lock().unwrap().remove(label).is_none() {
            return Err(StoreError::NotFound(format!("pending report {label}")));
        }
        self.published.lock().unwrap().insert(label.to_string());
        Ok(())
    }
}
