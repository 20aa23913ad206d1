//! Job Scheduler
//!
//! Bounded-concurrency worker pool over a single shared queue of job indices.
//! Workers pop the next index under a mutex, process the job, and repeat until
//! the queue is empty. Each worker returns the `(index, output)` pairs it
//! produced; results are assembled by index after the pool drains, so output
//! order always matches input order regardless of completion order.

use crate::error::EngineError;
use crate::types::Job;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Per-job work executed by a scheduler worker
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// `Default` is the "failed" value for a slot
    type Output: Default + Send;

    async fn process(&self, job: &Job) -> Self::Output;

    fn succeeded(output: &Self::Output) -> bool;
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of jobs not yet popped
    pub pending: usize,
    /// Number of jobs currently being processed
    pub processing: usize,
    /// Number of jobs that produced a usable output
    pub completed: usize,
    /// Number of jobs that failed permanently
    pub failed: usize,
}

/// Shared queue of job indices
pub struct JobQueue {
    pending: Mutex<VecDeque<usize>>,
    stats: RwLock<QueueStats>,
}

impl JobQueue {
    pub fn new(len: usize) -> Self {
        Self {
            pending: Mutex::new((0..len).collect()),
            stats: RwLock::new(QueueStats {
                pending: len,
                ..QueueStats::default()
            }),
        }
    }

    /// Pop the next index. The pop and the stats update happen under the
    /// queue lock, which is never held across an await point.
    pub fn pop(&self) -> Option<usize> {
        let mut pending = self.pending.lock();
        let index = pending.pop_front()?;
        let mut stats = self.stats.write();
        stats.pending = stats.pending.saturating_sub(1);
        stats.processing += 1;
        Some(index)
    }

    fn finish(&self, succeeded: bool) {
        let mut stats = self.stats.write();
        stats.processing = stats.processing.saturating_sub(1);
        if succeeded {
            stats.completed += 1;
        } else {
            stats.failed += 1;
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.stats.read().clone()
    }
}

/// Reject batches whose jobs do not carry `index == position`
pub fn validate_batch(jobs: &[Job]) -> Result<(), EngineError> {
    for (position, job) in jobs.iter().enumerate() {
        if job.index != position {
            return Err(EngineError::ConfigError(format!(
                "Job '{}' has index {} but sits at position {}",
                job.label, job.index, position
            )));
        }
    }
    Ok(())
}

/// Run every job through `processor` with at most `concurrency` in flight.
///
/// Returns one output per job, `results[i]` belonging to `jobs[i]`.
pub async fn run_batch<P: JobProcessor>(
    jobs: &[Job],
    processor: &P,
    concurrency: usize,
) -> Result<Vec<P::Output>, EngineError> {
    validate_batch(jobs)?;

    let total = jobs.len();
    let queue = JobQueue::new(total);
    let workers = concurrency.max(1).min(total.max(1));
    debug!(total, workers, "Starting batch");

    let produced = join_all(
        (0..workers).map(|worker_id| worker_loop(worker_id, &queue, jobs, processor)),
    )
    .await;

    let mut results: Vec<P::Output> = (0..total).map(|_| P::Output::default()).collect();
    for (index, output) in produced.into_iter().flatten() {
        results[index] = output;
    }

    let stats = queue.stats();
    info!(
        total,
        completed = stats.completed,
        failed = stats.failed,
        pending = stats.pending,
        "Batch drained"
    );
    Ok(results)
}

async fn worker_loop<P: JobProcessor>(
    worker_id: usize,
    queue: &JobQueue,
    jobs: &[Job],
    processor: &P,
) -> Vec<(usize, P::Output)> {
    debug!(worker_id, "Worker started");
    let mut produced = Vec::new();

    while let Some(index) = queue.pop() {
        let job = &jobs[index];
        debug!(worker_id, index, label = %job.label, "Processing job");
        let output = processor.process(job).await;
        queue.finish(P::succeeded(&output));
        produced.push((index, output));
    }

    debug!(worker_id, processed = produced.len(), "Worker stopped");
    produced
}
