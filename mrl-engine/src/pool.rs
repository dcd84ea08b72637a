//! A fixed-size pool of OS threads draining one shared [`JobQueue`].
//!
//! All pool state sits behind one mutex with a single condition variable.
//! Every waiter (idle workers, callers of [`WorkerPool::drain`]) re-checks its
//! own predicate after waking, so one broadcast serves both kinds of waiter.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use common::{Error, Result};
use tracing::{debug, error, info, trace};

use crate::job_queue::{Job, JobQueue};

#[derive(Debug, Default)]
struct PoolState {
    queue: JobQueue,

    /// Jobs dequeued by a worker whose task has not returned yet.
    in_flight: usize,

    /// Flips to `true` exactly once.
    shutdown: bool,

    /// Jobs whose task panicked.
    panicked: usize,
}

impl PoolState {
    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<PoolState>,

    /// Signalled when a job is queued, when the pool goes idle and on shutdown.
    changed: Condvar,
}

impl Shared {
    // The lock is never held across a task, so a poisoned lock still guards
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, PoolState>) -> MutexGuard<'a, PoolState> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, job: Job) -> Result<()> {
        let mut state = self.lock();
        if state.shutdown {
            return Err(Error::PoolShutdown);
        }
        trace!(job = job.label(), queued = state.queue.len() + 1, "job queued");
        state.queue.push_job(job);
        drop(state);

        // Broadcast: a barrier waiter may be parked on the same condition and
        // must not swallow the wakeup meant for a worker.
        self.changed.notify_all();
        Ok(())
    }

    /// Block until there is a job to run or the pool is shut down and empty.
    fn next_job(&self) -> Option<Job> {
        let mut state = self.lock();
        loop {
            if let Some(job) = state.queue.pop_job() {
                state.in_flight += 1;
                return Some(job);
            }
            if state.shutdown {
                return None;
            }
            state = self.wait(state);
        }
    }

    fn finish_job(&self, panicked: bool) {
        let mut state = self.lock();
        state.in_flight -= 1;
        if panicked {
            state.panicked += 1;
        }
        let idle = state.is_idle();
        drop(state);

        if idle {
            self.changed.notify_all();
        }
    }
}

fn worker_loop(id: usize, shared: Arc<Shared>) {
    debug!(worker = id, "worker started");

    while let Some(job) = shared.next_job() {
        let label = job.label().to_owned();
        trace!(worker = id, job = %label, "running job");

        let outcome = panic::catch_unwind(AssertUnwindSafe(move || job.run()));
        if outcome.is_err() {
            error!(worker = id, job = %label, "job panicked");
        }
        shared.finish_job(outcome.is_err());
    }

    debug!(worker = id, "worker exiting");
}

/// Cloneable, submit-only access to a [`WorkerPool`].
///
/// Lets a running job queue follow-up work without borrowing the pool.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    shared: Arc<Shared>,
}

impl PoolHandle {
    /// Queue `task` at the tail; fails once the pool began shutting down.
    pub fn submit<F>(&self, label: impl Into<String>, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Job::new(label, Box::new(task)))
    }
}

/// A fixed set of worker threads.
///
/// Created with its final size; all workers are running by the time
/// [`WorkerPool::new`] returns. Dropping the pool shuts it down.
#[derive(Debug)]
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers, each blocking until work or shutdown.
    pub fn new(worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(Error::InvalidConfig(
                "worker count must be positive".to_string(),
            ));
        }

        let mut pool = Self {
            shared: Arc::new(Shared::default()),
            workers: Vec::with_capacity(worker_count),
        };

        for id in 0..worker_count {
            let shared = pool.shared.clone();
            // On failure `pool` is dropped here, which joins the workers
            // that did start.
            let handle = thread::Builder::new()
                .name(format!("mrl-worker-{id}"))
                .spawn(move || worker_loop(id, shared))
                .map_err(Error::Spawn)?;
            pool.workers.push(handle);
        }

        info!(workers = worker_count, "worker pool started");
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            shared: self.shared.clone(),
        }
    }

    /// Queue `task` at the tail and wake the workers. Never blocks on the task.
    pub fn submit<F>(&self, label: impl Into<String>, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Job::new(label, Box::new(task)))
    }

    /// Jobs queued but not yet picked up.
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Jobs currently executing.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    /// Jobs whose task panicked so far.
    pub fn panicked_jobs(&self) -> usize {
        self.shared.lock().panicked
    }

    /// Block until the queue is empty and no job is executing.
    ///
    /// Jobs queued by running jobs are waited for too. Calling this from
    /// inside a pool job deadlocks, since that job counts as in flight.
    pub fn drain(&self) {
        let mut state = self.shared.lock();
        while !state.is_idle() {
            state = self.shared.wait(state);
        }
    }

    /// Stop accepting work, let the workers finish the queue, and join them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let first = {
            let mut state = self.shared.lock();
            let first = !state.shutdown;
            state.shutdown = true;
            first
        };
        self.shared.changed.notify_all();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked outside of a job");
            }
        }

        if first {
            info!("worker pool shut down");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}
