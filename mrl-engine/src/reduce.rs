//! The reduce driver and the per-partition value cursor.
//!
//! A partition's records arrive here sorted by key, so every key occupies
//! one contiguous run. The driver walks the runs and calls the reducer once
//! per run; the reducer pulls that run's values through
//! [`ReduceContext::get_next`].

use std::panic::{self, AssertUnwindSafe};

use bytes::{BufMut, Bytes, BytesMut};
use common::{Error, KeyValue, PartitionIndex, Result};
use tracing::{debug, error, trace};

use crate::app::Reducer;

/// Where `get_next` reads from next, and for which key.
#[derive(Debug, Default)]
struct Cursor {
    position: usize,
    key: Option<Bytes>,
}

/// Handle given to a reducer while it processes one key.
///
/// Owns the value cursor of exactly one partition.
#[derive(Debug)]
pub struct ReduceContext<'a> {
    partition: PartitionIndex,
    num_partitions: u32,
    records: &'a [KeyValue],
    cursor: Cursor,
    output: BytesMut,
}

impl<'a> ReduceContext<'a> {
    pub(crate) fn new(
        partition: PartitionIndex,
        num_partitions: u32,
        records: &'a [KeyValue],
    ) -> Self {
        Self {
            partition,
            num_partitions,
            records,
            cursor: Cursor::default(),
            output: BytesMut::new(),
        }
    }

    /// The partition this reduce job owns.
    pub fn partition(&self) -> PartitionIndex {
        self.partition
    }

    /// Next value of `key` in `partition`, or `None` once the key's values
    /// are used up.
    ///
    /// `partition` must be the one this reducer was invoked for. Asking for a
    /// key the cursor is not on moves the cursor forward to that key's first
    /// record at or after the cursor; records already passed are never
    /// handed out again.
    pub fn get_next(&mut self, key: &[u8], partition: PartitionIndex) -> Result<Option<Bytes>> {
        if partition >= self.num_partitions {
            return Err(Error::PartitionOutOfRange {
                index: partition,
                count: self.num_partitions,
            });
        }
        if partition != self.partition {
            return Err(Error::WrongPartition {
                owned: self.partition,
                requested: partition,
            });
        }
        Ok(self.next_value(key))
    }

    /// [`get_next`](Self::get_next) on this reducer's own partition.
    pub fn next_value(&mut self, key: &[u8]) -> Option<Bytes> {
        if self.cursor.key.as_deref() != Some(key) {
            self.relocate(key);
        }

        let record = self.records.get(self.cursor.position)?;
        if record.key.as_ref() != key {
            return None;
        }
        self.cursor.position += 1;
        Some(record.value())
    }

    /// Iterate over the remaining values of `key`.
    pub fn values<'c>(&'c mut self, key: &'c [u8]) -> Values<'c, 'a> {
        Values { ctx: self, key }
    }

    /// Append bytes to this partition's output.
    pub fn write(&mut self, data: impl AsRef<[u8]>) {
        self.output.put_slice(data.as_ref());
    }

    /// Point the cursor at the start of a key's run.
    fn position_at(&mut self, position: usize, key: Bytes) {
        self.cursor = Cursor {
            position,
            key: Some(key),
        };
    }

    fn relocate(&mut self, key: &[u8]) {
        let start = self.cursor.position.min(self.records.len());
        let position = start + self.records[start..].partition_point(|kv| kv.key.as_ref() < key);
        trace!(partition = self.partition, position, "cursor relocated");
        self.position_at(position, Bytes::copy_from_slice(key));
    }

    fn into_output(self) -> Bytes {
        self.output.freeze()
    }
}

/// Iterator over one key's values, see [`ReduceContext::values`].
#[derive(Debug)]
pub struct Values<'c, 'a> {
    ctx: &'c mut ReduceContext<'a>,
    key: &'c [u8],
}

impl Iterator for Values<'_, '_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.ctx.next_value(self.key)
    }
}

/// What one reduce job produced.
#[derive(Debug, Clone, Default)]
pub struct PartitionOutput {
    pub partition: PartitionIndex,

    /// Bytes the reducer wrote for this partition.
    pub data: Bytes,

    /// Records the partition held after the map phase.
    pub records: usize,

    /// Distinct keys, i.e. reducer invocations.
    pub keys: usize,

    /// Reducer invocations that returned an error or panicked.
    pub failed_keys: usize,
}

impl PartitionOutput {
    pub(crate) fn empty(partition: PartitionIndex) -> Self {
        Self {
            partition,
            ..Self::default()
        }
    }
}

/// Run `reducer` once per distinct key of a key-sorted partition.
pub(crate) fn perform_reduce<R>(
    reducer: &R,
    partition: PartitionIndex,
    num_partitions: u32,
    records: Vec<KeyValue>,
) -> PartitionOutput
where
    R: Reducer + ?Sized,
{
    debug!(partition, records = records.len(), "starting reduce task");

    let mut ctx = ReduceContext::new(partition, num_partitions, &records);
    let mut keys = 0;
    let mut failed_keys = 0;
    let mut start = 0;

    while start < records.len() {
        let key = records[start].key();
        let run = records[start..]
            .iter()
            .take_while(|kv| kv.key == key)
            .count();

        ctx.position_at(start, key.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| reducer.reduce(&key, &mut ctx)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(
                    partition,
                    key = %String::from_utf8_lossy(&key),
                    "reduce failed: {e:#}"
                );
                failed_keys += 1;
            }
            Err(_) => {
                error!(
                    partition,
                    key = %String::from_utf8_lossy(&key),
                    "reducer panicked"
                );
                failed_keys += 1;
            }
        }

        keys += 1;
        start += run;
    }

    let data = ctx.into_output();
    debug!(partition, keys, output = data.len(), "reduce task done");

    PartitionOutput {
        partition,
        data,
        records: records.len(),
        keys,
        failed_keys,
    }
}
