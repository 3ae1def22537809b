// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Background worker lifecycle.
//!
//! One OS thread per [`Worker`], created at construction. The thread
//! sleeps on a wake flag guarded by a condvar, runs the hook once per
//! consumed wake, and exits when the liveness flag is cleared. States:
//! Sleeping (blocked on the wake predicate) → Active (hook running) →
//! back to Sleeping, until Terminating → Joined.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Wake protocol state shared between the worker thread and every
/// [`WakeToken`].
struct WakeState {
    /// Wake flag + condvar. The flag is the wake predicate: the thread
    /// only leaves its wait when the flag is true, which guards against
    /// spurious condvar wakeups.
    wake: (Mutex<bool>, Condvar),
    /// Liveness flag. While true the thread keeps cycling; cleared by
    /// `terminate`, after which the next wake exits the loop instead of
    /// running the hook.
    running: AtomicBool,
}

/// Cloneable handle to a worker's wake protocol.
///
/// The hook receives one at spawn time so it can re-signal its own
/// worker (e.g. after draining one item of several). Signaling a
/// terminated worker is a harmless no-op.
#[derive(Clone)]
pub struct WakeToken {
    state: Arc<WakeState>,
}

impl WakeToken {
    /// Wake the worker: set the wake flag and notify the waiting thread.
    /// Signals coalesce — several signals before the thread wakes produce
    /// a single wake.
    pub fn signal(&self) {
        let (lock, cvar) = &self.state.wake;
        let mut pending = lock.lock().unwrap();
        *pending = true;
        cvar.notify_one();
    }

    /// Clear the wake flag without stopping the thread. A pending,
    /// not-yet-consumed wake is dropped; a later [`signal`](Self::signal)
    /// resumes wakeups. This does not interrupt a hook that is already
    /// running.
    pub fn quiesce(&self) {
        let (lock, _) = &self.state.wake;
        *lock.lock().unwrap() = false;
    }
}

/// Owns one background OS thread and its wake protocol.
///
/// The per-wake action is injected as a closure at spawn time; the
/// thread owns the closure and everything it captures, so the action can
/// never run against state that has already been torn down. Dropping the
/// worker terminates and joins the thread.
pub struct Worker {
    token: WakeToken,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread. `build` receives a [`WakeToken`] for the
    /// new worker and returns the hook the thread runs once per wake.
    ///
    /// The thread starts sleeping; nothing runs until the first
    /// [`signal`](Self::signal). A wake is consumed before the hook runs,
    /// so a hook that wants another cycle signals its token again. If the
    /// hook panics the thread exits; `terminate` still joins it.
    pub fn spawn<B, H>(name: &str, build: B) -> Self
    where
        B: FnOnce(WakeToken) -> H,
        H: FnMut() + Send + 'static,
    {
        let state = Arc::new(WakeState {
            wake: (Mutex::new(false), Condvar::new()),
            running: AtomicBool::new(true),
        });
        let token = WakeToken { state };
        let mut hook = build(token.clone());

        let thread_state = token.state.clone();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    let (lock, cvar) = &thread_state.wake;
                    let mut pending = lock.lock().unwrap();
                    while !*pending {
                        pending = cvar.wait(pending).unwrap();
                    }
                    // Each wake consumes the flag; blocking-wait semantics
                    // are restored once traffic stops.
                    *pending = false;
                    drop(pending);

                    if !thread_state.running.load(Ordering::Acquire) {
                        break;
                    }

                    hook();
                }
                tracing::trace!("worker thread exiting");
            })
            .expect("failed to spawn worker thread");

        tracing::trace!(worker = name, "worker spawned");
        Self {
            token,
            thread: Some(thread),
        }
    }

    /// Wake the worker so it runs the hook once. See [`WakeToken::signal`].
    pub fn signal(&self) {
        self.token.signal();
    }

    /// Stop treating wakeups as work for now. See [`WakeToken::quiesce`].
    pub fn quiesce(&self) {
        self.token.quiesce();
    }

    /// Stop and join the thread: clear the liveness flag, signal so the
    /// sleeping thread re-evaluates, and block until it exits. Idempotent.
    ///
    /// Blocking with no timeout — if the hook never returns, neither does
    /// this.
    pub fn terminate(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.token.state.running.store(false, Ordering::Release);
            self.token.signal();
            let _ = thread.join();
            tracing::trace!("worker terminated");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);
    const SETTLE: Duration = Duration::from_millis(200);

    #[test]
    fn signal_runs_hook_once() {
        let (ran_tx, ran_rx) = mpsc::channel();
        let mut worker = Worker::spawn("t-once", |_| move || {
            ran_tx.send(()).unwrap();
        });

        worker.signal();
        ran_rx.recv_timeout(WAIT).unwrap();
        // One signal, one run.
        assert!(ran_rx.recv_timeout(SETTLE).is_err());
        worker.terminate();
    }

    #[test]
    fn each_signal_wakes_again() {
        let (ran_tx, ran_rx) = mpsc::channel();
        let mut worker = Worker::spawn("t-again", |_| move || {
            ran_tx.send(()).unwrap();
        });

        worker.signal();
        ran_rx.recv_timeout(WAIT).unwrap();
        worker.signal();
        ran_rx.recv_timeout(WAIT).unwrap();
        worker.terminate();
    }

    #[test]
    fn hook_can_resignal_its_own_worker() {
        let (ran_tx, ran_rx) = mpsc::channel();
        let mut count = 0;
        let mut worker = Worker::spawn("t-resignal", |token| {
            move || {
                count += 1;
                ran_tx.send(count).unwrap();
                if count < 3 {
                    token.signal();
                }
            }
        });

        // One external signal drives three cycles via self-signaling.
        worker.signal();
        assert_eq!(ran_rx.recv_timeout(WAIT).unwrap(), 1);
        assert_eq!(ran_rx.recv_timeout(WAIT).unwrap(), 2);
        assert_eq!(ran_rx.recv_timeout(WAIT).unwrap(), 3);
        assert!(ran_rx.recv_timeout(SETTLE).is_err());
        worker.terminate();
    }

    #[test]
    fn quiesce_drops_pending_wake() {
        let (ran_tx, ran_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let mut worker = Worker::spawn("t-quiesce", |_| move || {
            ran_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
        });

        worker.signal();
        ran_rx.recv_timeout(WAIT).unwrap(); // hook entered, now blocked
        worker.signal(); // wake queued behind the running hook
        worker.quiesce(); // ...and dropped
        gate_tx.send(()).unwrap();

        assert!(ran_rx.recv_timeout(SETTLE).is_err());

        // A later signal resumes wakeups.
        worker.signal();
        ran_rx.recv_timeout(WAIT).unwrap();
        gate_tx.send(()).unwrap();
        worker.terminate();
    }

    #[test]
    fn terminate_is_idempotent() {
        let mut worker = Worker::spawn("t-idem", |_| || {});
        worker.terminate();
        worker.terminate();
    }

    #[test]
    fn no_hook_runs_after_terminate() {
        let (ran_tx, ran_rx) = mpsc::channel();
        let mut worker = Worker::spawn("t-after", |_| move || {
            ran_tx.send(()).unwrap();
        });

        worker.terminate();
        worker.signal();
        assert!(ran_rx.recv_timeout(SETTLE).is_err());
    }

    #[test]
    fn drop_terminates() {
        let (ran_tx, ran_rx) = mpsc::channel();
        let worker = Worker::spawn("t-drop", |_| move || {
            ran_tx.send(()).unwrap();
        });
        worker.signal();
        ran_rx.recv_timeout(WAIT).unwrap();
        drop(worker); // joins the thread
        assert!(ran_rx.recv_timeout(SETTLE).is_err());
    }
}
