use std::io;

use thiserror::Error;

use crate::PartitionIndex;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures the engine itself can report.
///
/// Application callbacks report their own failures through
/// [`anyhow::Error`]; those are logged by the engine and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    /// A job was configured with zero partitions.
    #[error("the number of partitions must be positive")]
    NoPartitions,

    /// Some other configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A partition index that does not exist in this run.
    #[error("partition {index} is out of range (partitions: {count})")]
    PartitionOutOfRange {
        index: PartitionIndex,
        count: u32,
    },

    /// A reducer asked for values from a partition it was not invoked for.
    #[error("reducer for partition {owned} cannot read partition {requested}")]
    WrongPartition {
        owned: PartitionIndex,
        requested: PartitionIndex,
    },

    /// Work was submitted after the pool began shutting down.
    #[error("worker pool is shutting down")]
    PoolShutdown,

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

impl Error {
    /// Whether this error is caller misuse rather than resource exhaustion.
    pub fn is_invalid_usage(&self) -> bool {
        !matches!(self, Error::Spawn(_))
    }
}
