//! Block and uncle records.
//!
//! Three distinct value types model the ledger data at different stages:
//!
//! - [`RpcBlock`]: an `eth_getBlockByNumber` result, before uncles are resolved.
//! - [`ChainRecord`]: a block plus its resolved uncle summary; this is what the
//!   record cache stores and what the processor consumes.
//! - [`UncleRecord`]: one uncle of a block, keyed by `(owner, index)`.
//!
//! [`BlockHeader`] is the capability shared by the two block types.

use serde::{Deserialize, Serialize};

use crate::params::{BLOCK_REWARD, EMPTY_UNCLES_HASH, MAX_UNCLES, NEPHEW_REWARD, UNCLE_DEPTH};
use crate::quantity;
use crate::{Bucket, RecordHash, Timestamp, TypesError, WeiAmount};

/// Block height. Keys of the record cache.
pub type BlockNumber = u64;

/// Fields common to every block representation.
pub trait BlockHeader {
    fn number(&self) -> BlockNumber;
    fn timestamp(&self) -> Timestamp;
    fn base_fee(&self) -> WeiAmount;
    fn gas_used(&self) -> u64;

    /// ETH destroyed by this block: `base_fee * gas_used`.
    fn burned(&self) -> WeiAmount {
        self.base_fee().saturating_mul(self.gas_used() as u128)
    }
}

/// A block header as returned by `eth_getBlockByNumber(n, false)`.
///
/// Only the fields the aggregates need are kept; everything else in the
/// response is ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    #[serde(with = "quantity::as_u64")]
    pub number: BlockNumber,
    pub hash: RecordHash,
    #[serde(with = "quantity::as_u64")]
    pub timestamp: u64,
    /// Absent on pre-London blocks.
    #[serde(default, with = "quantity::opt_wei", skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<WeiAmount>,
    #[serde(with = "quantity::as_u64")]
    pub gas_used: u64,
    #[serde(with = "quantity::as_u64")]
    pub gas_limit: u64,
    pub sha3_uncles: RecordHash,
    #[serde(default)]
    pub miner: String,
}

impl RpcBlock {
    /// Whether the header commits to a non-empty uncle list.
    ///
    /// Compared against the constant hash of an empty list, so the answer
    /// depends only on this block and never on its predecessor.
    pub fn has_uncles(&self) -> bool {
        self.sha3_uncles != EMPTY_UNCLES_HASH
    }
}

impl BlockHeader for RpcBlock {
    fn number(&self) -> BlockNumber {
        self.number
    }

    fn timestamp(&self) -> Timestamp {
        Timestamp::new(self.timestamp)
    }

    fn base_fee(&self) -> WeiAmount {
        self.base_fee_per_gas.unwrap_or(WeiAmount::ZERO)
    }

    fn gas_used(&self) -> u64 {
        self.gas_used
    }
}

/// An uncle header as returned by `eth_getUncleByBlockNumberAndIndex`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcUncle {
    #[serde(with = "quantity::as_u64")]
    pub number: BlockNumber,
    pub hash: RecordHash,
    #[serde(with = "quantity::as_u64")]
    pub timestamp: u64,
    #[serde(default)]
    pub miner: String,
}

/// One uncle of block `owner`, at position `index` in its uncle list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncleRecord {
    #[serde(flatten)]
    pub uncle: RpcUncle,
    #[serde(rename = "__owner")]
    pub owner: BlockNumber,
    #[serde(rename = "__index")]
    pub index: u32,
}

impl UncleRecord {
    pub fn new(uncle: RpcUncle, owner: BlockNumber, index: u32) -> Result<Self, TypesError> {
        if index >= MAX_UNCLES {
            return Err(TypesError::UncleIndexOutOfRange(index));
        }
        Ok(Self {
            uncle,
            owner,
            index,
        })
    }

    /// Reward paid to the uncle's miner: `(uncle + 8 - owner) * BLOCK_REWARD / 8`.
    pub fn reward(&self) -> WeiAmount {
        let depth = self.owner.saturating_sub(self.uncle.number);
        if depth >= UNCLE_DEPTH {
            return WeiAmount::ZERO;
        }
        WeiAmount::new(BLOCK_REWARD.raw() * (UNCLE_DEPTH - depth) as u128 / UNCLE_DEPTH as u128)
    }
}

/// A block with its uncle summary, the unit of the record cache.
///
/// Immutable once written. The uncle summary is stored alongside the ledger's
/// own fields (as `__uncle_count` / `__uncle_reward`) so consumers never need
/// to read the uncle files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    #[serde(flatten)]
    pub block: RpcBlock,
    #[serde(rename = "__uncle_count")]
    pub uncle_count: u32,
    #[serde(rename = "__uncle_reward")]
    pub uncle_reward: WeiAmount,
}

impl ChainRecord {
    /// Combine a fetched block with its resolved uncles.
    pub fn new(block: RpcBlock, uncles: &[UncleRecord]) -> Self {
        Self {
            block,
            uncle_count: uncles.len() as u32,
            uncle_reward: uncles.iter().map(UncleRecord::reward).sum(),
        }
    }

    pub fn hash(&self) -> RecordHash {
        self.block.hash
    }

    pub fn gas_limit(&self) -> u64 {
        self.block.gas_limit
    }

    /// Reward to the including miner: block reward plus nephew rewards.
    pub fn base_issuance(&self) -> WeiAmount {
        BLOCK_REWARD + NEPHEW_REWARD.saturating_mul(self.uncle_count as u128)
    }

    /// All ETH created by this block, including the uncles' rewards.
    pub fn issuance(&self) -> WeiAmount {
        self.base_issuance() + self.uncle_reward
    }

    pub fn hour_bucket(&self) -> Bucket {
        Bucket::hour_of(self.timestamp())
    }

    pub fn day_bucket(&self) -> Bucket {
        Bucket::day_of(self.timestamp())
    }
}

impl BlockHeader for ChainRecord {
    fn number(&self) -> BlockNumber {
        self.block.number
    }

    fn timestamp(&self) -> Timestamp {
        self.block.timestamp()
    }

    fn base_fee(&self) -> WeiAmount {
        self.block.base_fee()
    }

    fn gas_used(&self) -> u64 {
        self.block.gas_used
    }
}
