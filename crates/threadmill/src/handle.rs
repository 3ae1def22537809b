// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Caller-facing result handles.
//!
//! A handle is the receiving half of a one-shot slot. The worker thread
//! fulfills the slot exactly once — value or error — and delivery through
//! the slot is the only synchronization between the job and the caller.

use std::any::Any;
use std::cell::Cell;
use std::sync::mpsc;

use thiserror::Error;

/// Why a job produced no value.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job panicked; the payload message is captured.
    #[error("job panicked: {0}")]
    Panicked(String),
    /// The queue was torn down before the job ran.
    #[error("job discarded before it ran")]
    Discarded,
}

/// Handle to a job's eventual result.
///
/// Returned by `WorkQueue::submit` immediately; becomes ready once the
/// worker has executed the job. There is no built-in wait timeout —
/// callers that need one build it externally.
pub struct JobHandle<T> {
    rx: mpsc::Receiver<Result<T, JobError>>,
    taken: Cell<bool>,
}

impl<T> JobHandle<T> {
    /// Block until the result is available and take it.
    ///
    /// Returns [`JobError::Discarded`] if the queue was dropped with this
    /// job still unexecuted.
    pub fn wait(self) -> Result<T, JobError> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(mpsc::RecvError) => Err(JobError::Discarded),
        }
    }

    /// Take the result if it is already available, without blocking.
    ///
    /// `None` means the job has not run yet, or its result was already
    /// taken by an earlier call.
    pub fn try_wait(&self) -> Option<Result<T, JobError>> {
        if self.taken.get() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.taken.set(true);
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.taken.set(true);
                Some(Err(JobError::Discarded))
            }
        }
    }
}

/// Fulfilling half of the slot. Crate-private: only the queue's job
/// wrapper writes results.
pub(crate) struct ResultSlot<T> {
    tx: mpsc::SyncSender<Result<T, JobError>>,
}

impl<T> ResultSlot<T> {
    /// Deliver the result. Consumes the slot so it happens at most once;
    /// a caller that already dropped its handle is ignored.
    pub(crate) fn fulfill(self, result: Result<T, JobError>) {
        let _ = self.tx.send(result);
    }
}

/// A fresh slot/handle pair. Capacity 1, so fulfilling never blocks the
/// worker; dropping the slot unfulfilled disconnects the handle.
pub(crate) fn result_slot<T>() -> (ResultSlot<T>, JobHandle<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (
        ResultSlot { tx },
        JobHandle {
            rx,
            taken: Cell::new(false),
        },
    )
}

/// Extract a printable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
