use bytes::Bytes;

use crate::map::MapContext;
use crate::reduce::ReduceContext;
use crate::split::Split;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The map side of an application.
///
/// Called once per split, possibly from several worker threads at once.
/// Intermediate pairs go out through [`MapContext::emit`].
pub trait Mapper: Send + Sync {
    fn map(&self, split: &Split, ctx: &MapContext<'_>) -> anyhow::Result<()>;
}

/// The reduce side of an application.
///
/// Called once per distinct key of a partition. Values for `key` are pulled
/// one at a time with [`ReduceContext::get_next`].
pub trait Reducer: Send + Sync {
    fn reduce(&self, key: &Bytes, ctx: &mut ReduceContext<'_>) -> anyhow::Result<()>;
}

impl<F> Mapper for F
where
    F: Fn(&Split, &MapContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn map(&self, split: &Split, ctx: &MapContext<'_>) -> anyhow::Result<()> {
        self(split, ctx)
    }
}

impl<F> Reducer for F
where
    F: Fn(&Bytes, &mut ReduceContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn reduce(&self, key: &Bytes, ctx: &mut ReduceContext<'_>) -> anyhow::Result<()> {
        self(key, ctx)
    }
}

/// A map function reads one split and emits intermediate pairs.
pub type MapFn = fn(split: &Split, ctx: &MapContext<'_>) -> anyhow::Result<()>;

/// A reduce function consumes the values of one key.
pub type ReduceFn = fn(key: &Bytes, ctx: &mut ReduceContext<'_>) -> anyhow::Result<()>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}
