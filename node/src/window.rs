//! The processor's retained window and bucket aggregates.

use std::collections::VecDeque;

use ember_types::{BlockHeader, BlockNumber, Bucket, ChainRecord, Timestamp, WeiAmount};

/// Recent records, oldest first. Pruned by the processor to the current day.
#[derive(Clone, Debug, Default)]
pub struct RetainedWindow {
    records: VecDeque<ChainRecord>,
}

impl RetainedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ChainRecord) {
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&ChainRecord> {
        self.records.back()
    }

    /// The record before the last one.
    pub fn previous(&self) -> Option<&ChainRecord> {
        self.records.len().checked_sub(2).and_then(|i| self.records.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainRecord> {
        self.records.iter()
    }

    /// Drop records stamped before `start`.
    pub fn prune_before(&mut self, start: Timestamp) {
        while self
            .records
            .front()
            .is_some_and(|r| r.timestamp() < start)
        {
            self.records.pop_front();
        }
    }
}

/// Totals over one bucket of the retained window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub bucket: Bucket,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    /// Burned inside the bucket.
    pub burned: WeiAmount,
    /// Block and nephew rewards inside the bucket.
    pub base_issuance: WeiAmount,
    /// Uncle rewards inside the bucket.
    pub uncle_issuance: WeiAmount,
    /// Cumulative burned total as of the bucket's last block.
    pub cumulative_burned: WeiAmount,
}

impl AggregateSnapshot {
    pub fn block_count(&self) -> u64 {
        self.end_block - self.start_block + 1
    }

    pub fn issuance(&self) -> WeiAmount {
        self.base_issuance + self.uncle_issuance
    }

    /// Issuance minus burn, in wei. Negative when supply shrank.
    pub fn net_issuance(&self) -> i128 {
        let issued = self.issuance().raw() as i128;
        let burned = self.burned.raw() as i128;
        issued - burned
    }
}

/// Aggregate `bucket` over `window`.
///
/// `cumulative_total` is the running burned total including every record in
/// the window; the bucket's cumulative figure is recovered by subtracting the
/// records after the bucket end. Returns `None` when no record of the window
/// falls inside the bucket.
pub fn aggregate(
    window: &RetainedWindow,
    bucket: Bucket,
    cumulative_total: WeiAmount,
) -> Option<AggregateSnapshot> {
    let mut range: Option<(BlockNumber, BlockNumber)> = None;
    let mut burned = WeiAmount::ZERO;
    let mut base_issuance = WeiAmount::ZERO;
    let mut uncle_issuance = WeiAmount::ZERO;
    let mut burned_after = WeiAmount::ZERO;

    for record in window.iter() {
        let ts = record.timestamp();
        if bucket.contains(ts) {
            let number = record.number();
            range = Some(match range {
                Some((start, _)) => (start, number),
                None => (number, number),
            });
            burned += record.burned();
            base_issuance += record.base_issuance();
            uncle_issuance += record.uncle_reward;
        } else if ts >= bucket.end() {
            burned_after += record.burned();
        }
    }

    let (start_block, end_block) = range?;
    Some(AggregateSnapshot {
        bucket,
        start_block,
        end_block,
        burned,
        base_issuance,
        uncle_issuance,
        cumulative_burned: cumulative_total.saturating_sub(burned_after),
    })
}
