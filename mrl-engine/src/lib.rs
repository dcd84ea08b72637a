//! Single-process MapReduce.
//!
//! Map jobs run on a fixed pool of worker threads and emit intermediate
//! pairs into a partitioned in-memory store. Once every map job has
//! returned, one reduce job per partition walks that partition's keys and
//! hands each key to the reducer, which pulls the key's values one by one.
//!
//! ```no_run
//! use bytes::Bytes;
//! use mrl_engine::{run_job, resolve_splits, JobConfig, MapContext, ReduceContext, Split};
//!
//! fn map(split: &Split, ctx: &MapContext<'_>) -> anyhow::Result<()> {
//!     ctx.emit(split.id.as_bytes(), b"1");
//!     Ok(())
//! }
//!
//! fn reduce(key: &Bytes, ctx: &mut ReduceContext<'_>) -> anyhow::Result<()> {
//!     let count = ctx.values(key).count();
//!     ctx.write(format!("{} {}\n", String::from_utf8_lossy(key), count));
//!     Ok(())
//! }
//!
//! let splits = resolve_splits(["a.txt", "b.txt"]);
//! let _report = run_job(
//!     &splits,
//!     map as mrl_engine::MapFn,
//!     reduce as mrl_engine::ReduceFn,
//!     JobConfig::new(2, 2),
//! )?;
//! # Ok::<(), mrl_engine::Error>(())
//! ```

pub mod app;
pub mod job;
pub mod job_queue;
pub mod map;
pub mod pool;
pub mod reduce;
pub mod split;
pub mod store;

pub use app::{MapFn, Mapper, ReduceFn, Reducer, Workload};
pub use common::{partition, Error, KeyValue, PartitionIndex, Result};
pub use job::{run_job, JobConfig, JobReport, JobStats, PartitionStats};
pub use map::MapContext;
pub use pool::{PoolHandle, WorkerPool};
pub use reduce::{PartitionOutput, ReduceContext, Values};
pub use split::{resolve_splits, Split};
pub use store::PartitionStore;
