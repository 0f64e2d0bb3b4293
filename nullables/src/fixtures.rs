//! Builders for synthetic ledger data.

use ember_types::{
    BlockNumber, ChainRecord, RecordHash, RpcBlock, RpcUncle, WeiAmount, EMPTY_UNCLES_HASH,
};

/// Gas used by every fixture block.
pub const FIXTURE_GAS_USED: u64 = 1_000_000;

fn hash_for(number: BlockNumber, salt: u8) -> RecordHash {
    let mut bytes = [salt; 32];
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    RecordHash::new(bytes)
}

/// A block without uncles that burns exactly `burned`.
///
/// `burned` must be a multiple of [`FIXTURE_GAS_USED`] wei to round-trip exactly.
pub fn block(number: BlockNumber, timestamp: u64, burned: WeiAmount) -> RpcBlock {
    RpcBlock {
        number,
        hash: hash_for(number, 0xb0),
        timestamp,
        base_fee_per_gas: Some(WeiAmount::new(burned.raw() / FIXTURE_GAS_USED as u128)),
        gas_used: FIXTURE_GAS_USED,
        gas_limit: 30_000_000,
        sha3_uncles: EMPTY_UNCLES_HASH,
        miner: String::new(),
    }
}

/// Like [`block`], but committing to a non-empty uncle list.
pub fn block_with_uncles(number: BlockNumber, timestamp: u64, burned: WeiAmount) -> RpcBlock {
    RpcBlock {
        sha3_uncles: hash_for(number, 0x0c),
        ..block(number, timestamp, burned)
    }
}

/// An uncle mined `depth` blocks before `owner`.
pub fn uncle(owner: BlockNumber, depth: u64, timestamp: u64) -> RpcUncle {
    RpcUncle {
        number: owner - depth,
        hash: hash_for(owner - depth, 0x0d),
        timestamp,
        miner: String::new(),
    }
}

/// A cached record without uncles.
pub fn record(number: BlockNumber, timestamp: u64, burned: WeiAmount) -> ChainRecord {
    ChainRecord::new(block(number, timestamp, burned), &[])
}
