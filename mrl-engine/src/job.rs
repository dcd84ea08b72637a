//! Runs one MapReduce job end to end on a private worker pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use common::{Error, PartitionIndex, Result};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, info};

use crate::app::{Mapper, Reducer};
use crate::map::perform_map;
use crate::pool::WorkerPool;
use crate::reduce::{perform_reduce, PartitionOutput};
use crate::split::{schedule_order, Split};
use crate::store::PartitionStore;

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_PARTITIONS: u32 = 8;

/// Sizing of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobConfig {
    /// Number of worker threads shared by the map and reduce phases.
    pub workers: usize,

    /// Number of partitions, and so of reduce jobs.
    pub partitions: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_WORKERS),
            partitions: DEFAULT_PARTITIONS,
        }
    }
}

impl JobConfig {
    pub fn new(workers: usize, partitions: u32) -> Self {
        Self {
            workers,
            partitions,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(Error::NoPartitions);
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig(
                "worker count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-partition numbers of a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionStats {
    pub partition: PartitionIndex,
    pub records: usize,
    pub keys: usize,
    pub failed_keys: usize,
    pub output_bytes: usize,
}

/// Numbers describing a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub splits: usize,
    pub failed_splits: usize,
    pub records: usize,
    pub keys: usize,
    pub failed_keys: usize,

    /// Jobs that panicked instead of returning.
    pub panicked_jobs: usize,

    pub partitions: Vec<PartitionStats>,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Reducer output, indexed by partition.
    pub outputs: Vec<Bytes>,

    pub stats: JobStats,
}

/// Run `mapper` over every split and `reducer` over every distinct key.
///
/// Splits are submitted smallest first. The reduce phase starts only after
/// every map job has returned. Blocks until all work is done and the pool
/// is torn down.
///
/// Failing callbacks are logged and counted in [`JobStats`]; the only errors
/// returned are bad configuration and failure to start the pool.
pub fn run_job<M, R>(
    splits: &[Split],
    mapper: M,
    reducer: R,
    config: JobConfig,
) -> Result<JobReport>
where
    M: Mapper + 'static,
    R: Reducer + 'static,
{
    config.validate()?;

    let store = Arc::new(PartitionStore::new(config.partitions)?);
    let pool = WorkerPool::new(config.workers)?;
    info!(
        splits = splits.len(),
        workers = config.workers,
        partitions = config.partitions,
        "starting job"
    );

    // 1. Mapping stage.
    let mapper = Arc::new(mapper);
    let failed_splits = Arc::new(AtomicUsize::new(0));

    for split in schedule_order(splits) {
        let mapper = mapper.clone();
        let store = store.clone();
        let failed_splits = failed_splits.clone();

        pool.submit(format!("map {split}"), move || {
            if let Err(e) = perform_map(mapper.as_ref(), &split, &store) {
                error!("{e:#}");
                failed_splits.fetch_add(1, Ordering::Relaxed);
            }
        })?;
    }

    // No partition may be read until every map job has returned.
    pool.drain();
    let records = store.len();
    info!(records, "map phase complete");

    // 2. Reduce stage.
    let reducer = Arc::new(reducer);
    let outputs: Arc<DashMap<PartitionIndex, PartitionOutput>> = Arc::new(DashMap::new());
    let num_partitions = config.partitions;

    for index in 0..num_partitions {
        let reducer = reducer.clone();
        let store = store.clone();
        let outputs = outputs.clone();

        pool.submit(format!("reduce {index}"), move || {
            match store.take_sorted(index) {
                Ok(records) => {
                    let output = perform_reduce(reducer.as_ref(), index, num_partitions, records);
                    outputs.insert(index, output);
                }
                Err(e) => error!(partition = index, "cannot reduce partition: {e}"),
            }
        })?;
    }

    pool.drain();
    let panicked_jobs = pool.panicked_jobs();
    pool.shutdown();

    let mut report = JobReport {
        outputs: Vec::with_capacity(num_partitions as usize),
        stats: JobStats {
            splits: splits.len(),
            failed_splits: failed_splits.load(Ordering::Relaxed),
            records,
            panicked_jobs,
            ..JobStats::default()
        },
    };

    for index in 0..num_partitions {
        // A partition whose records could not be taken leaves no entry behind.
        let output = outputs
            .remove(&index)
            .map(|(_, output)| output)
            .unwrap_or_else(|| PartitionOutput::empty(index));

        report.stats.keys += output.keys;
        report.stats.failed_keys += output.failed_keys;
        report.stats.partitions.push(PartitionStats {
            partition: index,
            records: output.records,
            keys: output.keys,
            failed_keys: output.failed_keys,
            output_bytes: output.data.len(),
        });
        report.outputs.push(output.data);
    }

    info!(
        keys = report.stats.keys,
        failed_splits = report.stats.failed_splits,
        failed_keys = report.stats.failed_keys,
        "job complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MapContext, ReduceContext};

    fn noop_map(_split: &Split, _ctx: &MapContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn noop_reduce(_key: &Bytes, _ctx: &mut ReduceContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn zero_partitions_is_invalid_usage() {
        let err = run_job(
            &[],
            noop_map as crate::MapFn,
            noop_reduce as crate::ReduceFn,
            JobConfig::new(2, 0),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoPartitions));
        assert!(err.is_invalid_usage());
    }

    #[test]
    fn zero_workers_is_invalid_usage() {
        let err = run_job(
            &[],
            noop_map as crate::MapFn,
            noop_reduce as crate::ReduceFn,
            JobConfig::new(0, 2),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn no_splits_still_yields_every_partition() {
        let report = run_job(
            &[],
            noop_map as crate::MapFn,
            noop_reduce as crate::ReduceFn,
            JobConfig::new(2, 3),
        )
        .unwrap();

        assert_eq!(report.outputs.len(), 3);
        assert!(report.outputs.iter().all(Bytes::is_empty));
        assert_eq!(report.stats.records, 0);
        assert_eq!(report.stats.partitions.len(), 3);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(JobConfig::default().validate().is_ok());
    }
}
