//! Chain parameters used by the aggregates.

use crate::amount::WEI_PER_ETH;
use crate::{BlockNumber, RecordHash, WeiAmount};

/// First block with an EIP-1559 base fee (the London hard fork).
pub const LONDON: BlockNumber = 12_965_000;

/// Static block reward paid to the miner of every block.
pub const BLOCK_REWARD: WeiAmount = WeiAmount::new(2 * WEI_PER_ETH);

/// Extra reward for the including miner per referenced uncle (1/32 of the block reward).
pub const NEPHEW_REWARD: WeiAmount = WeiAmount::new(2 * WEI_PER_ETH / 32);

/// A block references at most this many uncles.
pub const MAX_UNCLES: u32 = 2;

/// Uncles older than this many generations earn nothing.
pub const UNCLE_DEPTH: u64 = 8;

/// `sha3Uncles` of a block without uncles: keccak256(rlp([])).
pub const EMPTY_UNCLES_HASH: RecordHash = RecordHash::new([
    0x1d, 0xcc, 0x4d, 0xe8, 0xde, 0xc7, 0x5d, 0x7a, 0xab, 0x85, 0xb5, 0x67, 0xb6, 0xcc, 0xd4, 0x1a,
    0xd3, 0x12, 0x45, 0x1b, 0x94, 0x8a, 0x74, 0x13, 0xf0, 0xa1, 0x42, 0xfd, 0x40, 0xd4, 0x93, 0x47,
]);

/// A known cumulative burn total: everything burned strictly before `first_block`.
///
/// Seeding the processor from a checkpoint avoids replaying every block since London.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    /// First block the processor consumes when starting from this checkpoint.
    pub first_block: BlockNumber,
    /// Total burned in blocks `LONDON..first_block`.
    pub burned_before: WeiAmount,
}

/// Built-in checkpoints, ascending by block.
pub const CHECKPOINTS: [Checkpoint; 4] = [
    Checkpoint {
        first_block: LONDON,
        burned_before: WeiAmount::new(0),
    },
    Checkpoint {
        first_block: 13_233_801,
        burned_before: WeiAmount::new(301_720_664_913_446_243_502_258),
    },
    Checkpoint {
        first_block: 13_596_501,
        burned_before: WeiAmount::new(848_916_085_936_463_748_695_936),
    },
    Checkpoint {
        first_block: 13_648_001,
        burned_before: WeiAmount::new(949_398_242_163_151_858_483_080),
    },
];

impl Checkpoint {
    /// The built-in checkpoint starting exactly at `first_block`.
    pub fn builtin(first_block: BlockNumber) -> Option<Self> {
        CHECKPOINTS
            .iter()
            .copied()
            .find(|c| c.first_block == first_block)
    }

    /// The most recent built-in checkpoint.
    pub fn latest() -> Self {
        CHECKPOINTS[CHECKPOINTS.len() - 1]
    }
}
