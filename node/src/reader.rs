//! Strictly ordered reads from the record cache.

use std::sync::Arc;

use ember_store::{RecordStore, StoreError};
use ember_types::{BlockNumber, ChainRecord};

/// Reads cached records one key at a time, in key order, never skipping.
///
/// The reader never waits: a miss means ingestion has not reached the key yet
/// and the caller decides when to ask again.
pub struct SequentialReader<S> {
    store: Arc<S>,
    next: BlockNumber,
}

impl<S: RecordStore> SequentialReader<S> {
    /// A reader whose first [`poll_next`](Self::poll_next) asks for `first`.
    pub fn new(store: Arc<S>, first: BlockNumber) -> Self {
        Self { store, next: first }
    }

    /// The record at `key`, if cached.
    pub fn read(&self, key: BlockNumber) -> Result<Option<ChainRecord>, StoreError> {
        self.store.get_record(key)
    }

    /// The next record in order. The cursor advances only on a hit.
    pub fn poll_next(&mut self) -> Result<Option<ChainRecord>, StoreError> {
        let record = self.read(self.next)?;
        if record.is_some() {
            self.next += 1;
        }
        Ok(record)
    }

    /// Key the next [`poll_next`](Self::poll_next) will ask for.
    pub fn next_key(&self) -> BlockNumber {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_nullables::fixtures;
    use ember_nullables::NullRecordStore;
    use ember_store::OnConflict;
    use ember_types::WeiAmount;

    #[test]
    fn cursor_advances_only_on_hit() {
        let store = Arc::new(NullRecordStore::new());
        let mut reader = SequentialReader::new(Arc::clone(&store), 100);

        assert!(reader.poll_next().unwrap().is_none());
        assert_eq!(reader.next_key(), 100);

        for n in [100, 101, 103] {
            store
                .put_record(&fixtures::record(n, 1_636_000_000 + n, WeiAmount::ZERO), OnConflict::Warn)
                .unwrap();
        }
        assert_eq!(reader.poll_next().unwrap().unwrap().block.number, 100);
        assert_eq!(reader.poll_next().unwrap().unwrap().block.number, 101);
        // 102 is missing: 103 must not be delivered ahead of it.
        assert!(reader.poll_next().unwrap().is_none());
        assert_eq!(reader.next_key(), 102);
        assert!(reader.read(103).unwrap().is_some());
    }
}
