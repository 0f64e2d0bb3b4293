//! Fundamental types for the EMBER burn tracker.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! wei/USD amounts, timestamps and reporting buckets, block and uncle records,
//! and the chain parameters the aggregates are computed with.

pub mod amount;
pub mod bucket;
pub mod error;
pub mod hash;
pub mod params;
pub mod quantity;
pub mod record;
pub mod time;

pub use amount::{UsdAmount, WeiAmount};
pub use bucket::{Bucket, Threshold};
pub use error::TypesError;
pub use hash::RecordHash;
pub use params::{Checkpoint, BLOCK_REWARD, CHECKPOINTS, EMPTY_UNCLES_HASH, LONDON, NEPHEW_REWARD};
pub use record::{BlockHeader, BlockNumber, ChainRecord, RpcBlock, RpcUncle, UncleRecord};
pub use time::{Clock, SystemClock, Timestamp};
