//! Block record cache trait.

use crate::StoreError;
use ember_types::{BlockNumber, ChainRecord, UncleRecord};

/// How an overwrite of an existing entry should be reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnConflict {
    /// Overwriting is expected (e.g. a forced re-fetch); logged at debug level.
    Routine,
    /// Overwriting means cached data was fetched again unexpectedly; logged as a warning.
    Warn,
}

/// Durable cache of block records keyed by block number, and of uncle records
/// keyed by `(owner, index)`.
///
/// Each key has exactly one writer for its lifetime. Writes are atomic: a
/// reader observes either the previous entry, nothing, or the complete new
/// entry.
pub trait RecordStore {
    /// Store a block record, replacing any existing entry for its number.
    fn put_record(&self, record: &ChainRecord, on_conflict: OnConflict) -> Result<(), StoreError>;

    /// Retrieve a block record. A corrupt empty entry is removed and reported as absent.
    fn get_record(&self, number: BlockNumber) -> Result<Option<ChainRecord>, StoreError>;

    /// Store an uncle record under `(uncle.owner, uncle.index)`.
    fn put_uncle(&self, uncle: &UncleRecord, on_conflict: OnConflict) -> Result<(), StoreError>;

    /// Retrieve an uncle record.
    fn get_uncle(&self, owner: BlockNumber, index: u32) -> Result<Option<UncleRecord>, StoreError>;

    /// Whether an uncle entry exists, without parsing it.
    fn has_uncle(&self, owner: BlockNumber, index: u32) -> Result<bool, StoreError>;

    /// Number of uncles of `owner` whose caching is complete.
    ///
    /// Uncles are always written in descending index order, so index 0 lands
    /// last and marks the set complete. An index 1 entry without index 0 is a
    /// partial write and counts as nothing.
    fn cached_uncle_count(&self, owner: BlockNumber) -> Result<u32, StoreError> {
        if !self.has_uncle(owner, 0)? {
            return Ok(0);
        }
        if self.has_uncle(owner, 1)? {
            Ok(2)
        } else {
            Ok(1)
        }
    }
}
