// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Busy-wait lock for short critical sections.
//!
//! Spins on an atomic flag instead of parking the thread. Worth it when
//! the critical section is a handful of instructions (a queue push/pop)
//! and contention is brief; a blocked `std::sync::Mutex` costs more than
//! the spin there.

use std::sync::atomic::{AtomicBool, Ordering};

/// Spin lock over an atomic flag. Not reentrant — locking twice from the
/// same thread deadlocks.
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire the lock, spinning until it is free. No back-off.
    pub fn lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    /// Try to acquire the lock without spinning.
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Release the lock unconditionally.
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::UnsafeCell;
    use std::sync::Arc;

    struct Guarded {
        lock: SpinLock,
        value: UnsafeCell<u64>,
    }

    // Safety: `value` is only touched while `lock` is held.
    unsafe impl Sync for Guarded {}

    #[test]
    fn lock_unlock_relock() {
        let lock = SpinLock::new();
        lock.lock();
        lock.unlock();
        lock.lock();
        lock.unlock();
    }

    #[test]
    fn try_lock_fails_while_held() {
        let lock = SpinLock::new();
        lock.lock();
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(lock.try_lock());
        lock.unlock();
    }

    #[test]
    fn mutual_exclusion() {
        let guarded = Arc::new(Guarded {
            lock: SpinLock::new(),
            value: UnsafeCell::new(0),
        });

        let mut handles = vec![];
        for _ in 0..8 {
            let g = guarded.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    g.lock.lock();
                    unsafe { *g.value.get() += 1 };
                    g.lock.unlock();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        guarded.lock.lock();
        let total = unsafe { *guarded.value.get() };
        guarded.lock.unlock();
        assert_eq!(total, 8000);
    }
}
