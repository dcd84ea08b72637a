use std::collections::VecDeque;
use std::fmt;

/// Work a pool thread runs to completion.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A queued unit of work.
///
/// The queue owns the job until a worker dequeues it; the worker then owns it
/// and drops it once the task returns.
pub struct Job {
    /// Short description used in logs.
    label: String,

    task: Task,
}

impl Job {
    pub fn new(label: impl Into<String>, task: Task) -> Self {
        Self {
            label: label.into(),
            task,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consume the job and run its task.
    pub fn run(self) {
        (self.task)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("label", &self.label).finish()
    }
}

/// Unbounded FIFO of pending jobs.
///
/// Not synchronized on its own; the pool only touches it under its lock.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    /// Default Ctor.
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }

    /// The number of jobs waiting to run.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Push new job at the tail.
    pub fn push_job(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    /// Take the job at the head, if any.
    pub fn pop_job(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn jobs_come_out_in_submission_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut queue = JobQueue::new();
        for i in 0..4 {
            let seen = seen.clone();
            let task = Box::new(move || seen.lock().unwrap().push(i));
            queue.push_job(Job::new(format!("job-{i}"), task));
        }
        assert_eq!(queue.len(), 4);

        let mut labels = Vec::new();
        while let Some(job) = queue.pop_job() {
            labels.push(job.label().to_string());
            job.run();
        }

        assert!(queue.is_empty());
        assert_eq!(labels, ["job-0", "job-1", "job-2", "job-3"]);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_queue_pops_nothing() {
        let mut queue = JobQueue::default();
        assert!(queue.pop_job().is_none());
        assert_eq!(queue.len(), 0);
    }
}
