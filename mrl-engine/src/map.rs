use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use tracing::debug;

use crate::app::Mapper;
use crate::split::Split;
use crate::store::PartitionStore;

/// Handle given to a mapper for the duration of one map call.
///
/// Only reachable from inside [`Mapper::map`], so pairs can't be emitted
/// outside of the map phase.
#[derive(Debug)]
pub struct MapContext<'a> {
    store: &'a PartitionStore,
    emitted: AtomicUsize,
}

impl<'a> MapContext<'a> {
    pub(crate) fn new(store: &'a PartitionStore) -> Self {
        Self {
            store,
            emitted: AtomicUsize::new(0),
        }
    }

    /// Record one intermediate pair. Both halves are copied.
    ///
    /// Safe to call from any number of concurrently running mappers.
    pub fn emit(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        self.store.emit(key.as_ref(), value.as_ref());
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of partitions in this run.
    pub fn num_partitions(&self) -> u32 {
        self.store.num_partitions()
    }

    /// Pairs emitted through this context so far.
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }
}

/// Run `mapper` over one split and return how many pairs it emitted.
pub(crate) fn perform_map<M>(
    mapper: &M,
    split: &Split,
    store: &PartitionStore,
) -> anyhow::Result<usize>
where
    M: Mapper + ?Sized,
{
    debug!(split = %split, size = ?split.size, "starting map task");

    let ctx = MapContext::new(store);
    mapper
        .map(split, &ctx)
        .with_context(|| format!("map task for split `{split}` failed"))?;

    let emitted = ctx.emitted();
    debug!(split = %split, emitted, "map task done");
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(split: &Split, ctx: &MapContext<'_>) -> anyhow::Result<()> {
        for word in split.id.split('-') {
            ctx.emit(word, "1");
        }
        Ok(())
    }

    fn broken(_split: &Split, ctx: &MapContext<'_>) -> anyhow::Result<()> {
        ctx.emit("partial", "1");
        anyhow::bail!("input was not in the expected format")
    }

    #[test]
    fn counts_emitted_pairs() {
        let store = PartitionStore::new(2).unwrap();
        let split = Split::new("a-b-a", None);

        let emitted = perform_map(&(words as crate::MapFn), &split, &store).unwrap();
        assert_eq!(emitted, 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn failure_names_the_split() {
        let store = PartitionStore::new(1).unwrap();
        let split = Split::new("input/bad.txt", Some(3));

        let err = perform_map(&(broken as crate::MapFn), &split, &store).unwrap_err();
        assert!(format!("{err:#}").contains("input/bad.txt"));
        // Pairs emitted before the failure stay in the store.
        assert_eq!(store.len(), 1);
    }
}
