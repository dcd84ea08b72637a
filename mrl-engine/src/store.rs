//! In-memory shuffle storage.
//!
//! One append-only log per partition, each behind its own lock. Mappers
//! append concurrently during the map phase; after the map barrier each log
//! is moved out exactly once by the reduce job that owns it.

use std::num::NonZeroU32;
use std::sync::{Mutex, MutexGuard, PoisonError};

use common::{partition_of, Error, KeyValue, PartitionIndex, Result};
use tracing::trace;

#[derive(Debug, Default)]
struct Partition {
    log: Mutex<Vec<KeyValue>>,
}

impl Partition {
    // Appends are a single `push`, so a poisoned log is still well formed.
    fn lock(&self) -> MutexGuard<'_, Vec<KeyValue>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `N` independent partitions of intermediate records.
#[derive(Debug)]
pub struct PartitionStore {
    num_partitions: NonZeroU32,
    partitions: Vec<Partition>,
}

impl PartitionStore {
    pub fn new(num_partitions: u32) -> Result<Self> {
        let num_partitions = NonZeroU32::new(num_partitions).ok_or(Error::NoPartitions)?;
        let partitions = (0..num_partitions.get())
            .map(|_| Partition::default())
            .collect();

        Ok(Self {
            num_partitions,
            partitions,
        })
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions.get()
    }

    /// Partition a key is routed to.
    pub fn partition_for(&self, key: &[u8]) -> PartitionIndex {
        partition_of(key, self.num_partitions)
    }

    /// Copy `key` and `value` into a new record at the tail of the key's
    /// partition and return that partition's index.
    pub fn emit(&self, key: &[u8], value: &[u8]) -> PartitionIndex {
        let index = self.partition_for(key);
        let record = KeyValue::copy_from(key, value);

        let mut log = self.partitions[index as usize].lock();
        log.push(record);
        trace!(partition = index, len = log.len(), "record appended");

        index
    }

    /// Total number of records across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records currently held by one partition.
    pub fn partition_len(&self, index: PartitionIndex) -> Result<usize> {
        Ok(self.get(index)?.lock().len())
    }

    /// Move a partition's records out, stably sorted by key.
    ///
    /// Records sharing a key end up adjacent and keep their append order.
    /// Must only run once the map phase is over; the partition is left empty.
    pub fn take_sorted(&self, index: PartitionIndex) -> Result<Vec<KeyValue>> {
        let mut records = std::mem::take(&mut *self.get(index)?.lock());
        records.sort_by_key(KeyValue::key);
        Ok(records)
    }

    fn get(&self, index: PartitionIndex) -> Result<&Partition> {
        self.partitions
            .get(index as usize)
            .ok_or(Error::PartitionOutOfRange {
                index,
                count: self.num_partitions(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use bytes::Bytes;

    use super::*;

    #[test]
    fn zero_partitions_is_rejected() {
        assert!(matches!(PartitionStore::new(0), Err(Error::NoPartitions)));
    }

    #[test]
    fn emit_routes_by_partitioner() {
        let store = PartitionStore::new(4).unwrap();
        for key in ["apple", "banana", "cherry", "durian", "elderberry"] {
            let index = store.emit(key.as_bytes(), b"1");
            assert_eq!(index, common::partition(key.as_bytes(), 4).unwrap());
        }
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn take_sorted_groups_keys_and_keeps_append_order() {
        let store = PartitionStore::new(1).unwrap();
        for (k, v) in [("b", "1"), ("a", "2"), ("b", "3"), ("a", "4"), ("c", "5")] {
            store.emit(k.as_bytes(), v.as_bytes());
        }

        let records = store.take_sorted(0).unwrap();
        let pairs: Vec<_> = records.iter().map(|kv| kv.to_string()).collect();
        assert_eq!(pairs, ["a 2", "a 4", "b 1", "b 3", "c 5"]);

        // The log was moved out.
        assert_eq!(store.partition_len(0).unwrap(), 0);
    }

    #[test]
    fn emit_copies_its_input() {
        let store = PartitionStore::new(1).unwrap();
        let mut key = b"key".to_vec();
        store.emit(&key, b"v");
        key[0] = b'K';

        let records = store.take_sorted(0).unwrap();
        assert_eq!(records[0].key, Bytes::from_static(b"key"));
    }

    #[test]
    fn out_of_range_partition() {
        let store = PartitionStore::new(2).unwrap();
        assert!(matches!(
            store.partition_len(2),
            Err(Error::PartitionOutOfRange { index: 2, count: 2 })
        ));
        assert!(store.take_sorted(7).is_err());
    }

    #[test]
    fn concurrent_emits_are_all_kept() {
        let store = Arc::new(PartitionStore::new(3).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("k{}", i % 13);
                        store.emit(key.as_bytes(), format!("{t}:{i}").as_bytes());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8 * 500);
    }
}
