// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! FIFO job queue driven by a background worker.
//!
//! Producers push boxed jobs under the queue's lock strategy and signal
//! the worker; the worker pops one job per wake and runs it outside the
//! lock, so a long job never blocks submission. Insertion order is
//! execution order. The queue is unbounded — submission never blocks and
//! there is no backpressure.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::handle::{self, JobError, JobHandle};
use crate::strategy::{LockMode, SwitchMutex};
use crate::worker::Worker;

/// A queued unit of work: the caller's closure plus its result slot,
/// erased to a zero-argument call.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single-consumer job queue.
///
/// Exactly one worker thread drains each instance; any number of caller
/// threads may submit concurrently under `Spin` or `Blocking` mode. In
/// `LockMode::None` the queue itself does no synchronization and the
/// caller must guarantee that submissions never overlap the worker's
/// bookkeeping (e.g. by awaiting each result before the next submit).
///
/// Dropping the queue discards unexecuted jobs (their handles resolve to
/// [`JobError::Discarded`]) and joins the worker. A job that never
/// returns makes the drop block forever.
pub struct WorkQueue {
    jobs: Arc<SwitchMutex<VecDeque<Job>>>,
    worker: Worker,
}

impl WorkQueue {
    /// Create a queue whose lock strategy is fixed to `mode`.
    pub fn new(mode: LockMode) -> Self {
        Self::with_name("threadmill-worker", mode)
    }

    /// Like [`new`](Self::new), with an explicit worker thread name.
    pub fn with_name(name: &str, mode: LockMode) -> Self {
        let jobs: Arc<SwitchMutex<VecDeque<Job>>> =
            Arc::new(SwitchMutex::new(mode, VecDeque::new()));

        let hook_jobs = jobs.clone();
        let worker = Worker::spawn(name, |token| {
            move || {
                let (job, more) = hook_jobs.lock(|q| {
                    let job = q.pop_front();
                    (job, !q.is_empty())
                });
                if let Some(job) = job {
                    // Re-arm before running: each wake is consumed, so the
                    // next queued item needs its own. A quiesce landing
                    // after this still halts the drain at the next item.
                    if more {
                        token.signal();
                    }
                    // Outside the lock — a long job must not block
                    // producers or the queue's own bookkeeping.
                    job();
                }
                // Empty queue on wake is a normal, silent no-op.
            }
        });

        Self { jobs, worker }
    }

    /// Submit a job; returns its handle immediately.
    ///
    /// Arguments are captured by the closure at call time. The job's
    /// panic, if any, is caught and delivered through the handle; the
    /// worker thread carries on with subsequent jobs either way.
    pub fn submit<T, F>(&self, job: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (slot, handle) = handle::result_slot();
        let job: Job = Box::new(move || {
            match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(value) => slot.fulfill(Ok(value)),
                Err(payload) => {
                    slot.fulfill(Err(JobError::Panicked(handle::panic_message(payload))))
                }
            }
        });

        let depth = self.jobs.lock(|q| {
            q.push_back(job);
            q.len()
        });
        tracing::trace!(depth, "job submitted");
        self.worker.signal();
        handle
    }

    /// Number of jobs waiting to run. An empty queue is a normal state,
    /// not an error.
    pub fn pending(&self) -> usize {
        self.jobs.lock(|q| q.len())
    }

    /// The lock strategy selected at construction.
    pub fn mode(&self) -> LockMode {
        self.jobs.mode()
    }

    /// Stop treating wakeups as work for now: already-queued jobs stay
    /// queued, the worker stays alive, and the next [`submit`](Self::submit)
    /// (or any signal) resumes draining.
    pub fn quiesce(&self) {
        self.worker.quiesce();
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        // Discard under the lock, then join outside it — holding the lock
        // across the join would deadlock against a hook blocked on it.
        let discarded = self.jobs.lock(|q| {
            let n = q.len();
            q.clear();
            n
        });
        if discarded > 0 {
            tracing::debug!(discarded, "discarding unexecuted jobs at teardown");
        }
        self.worker.terminate();
    }
}
