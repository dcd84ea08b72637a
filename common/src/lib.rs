//! Shared types for the in-process MapReduce engine.
//!
//! Mappers emit intermediate key-value pairs which are sharded into
//! partitions by [`partition`]. Keys and values are opaque byte strings;
//! nothing in this crate interprets them.

use std::fmt;
use std::fmt::Formatter;
use std::num::NonZeroU32;

use bytes::Bytes;

pub mod error;
pub mod utils;

pub use error::{Error, Result};

/////////////////////////////////////////////////////////////////////////////
// Partitioning
/////////////////////////////////////////////////////////////////////////////

/// Index of one shard of the intermediate key space.
pub type PartitionIndex = u32;

const HASH_SEED: u64 = 5381;

fn djb2(key: &[u8]) -> u64 {
    key.iter().fold(HASH_SEED, |hash, &byte| {
        hash.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

/// Hashes an intermediate key, masked to 31 bits.
///
/// Useful for applications that want to bucket keys the same way the
/// engine does without going through [`partition`].
pub fn ihash(key: &[u8]) -> u32 {
    (djb2(key) & 0x7fff_ffff) as u32
}

/// Compute the partition a key belongs to, in `[0, num_partitions)`.
///
/// The mapping is deterministic: the same key always lands in the same
/// partition for a given `num_partitions`. Distinct keys may collide.
pub fn partition(key: &[u8], num_partitions: u32) -> Result<PartitionIndex> {
    NonZeroU32::new(num_partitions)
        .map(|n| partition_of(key, n))
        .ok_or(Error::NoPartitions)
}

/// [`partition`] for callers that already hold a non-zero partition count.
#[inline]
pub fn partition_of(key: &[u8], num_partitions: NonZeroU32) -> PartitionIndex {
    (djb2(key) % u64::from(num_partitions.get())) as PartitionIndex
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single intermediate key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,

    /// The value.
    pub value: Bytes,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            String::from_utf8_lossy(&self.key),
            String::from_utf8_lossy(&self.value)
        )
    }
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    /// Build a pair that owns a fresh copy of the given key and value.
    pub fn copy_from(key: &[u8], value: &[u8]) -> Self {
        Self {
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
        }
    }

    /// Get the key of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// Get the value of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn value(&self) -> Bytes {
        self.value.clone()
    }
}
