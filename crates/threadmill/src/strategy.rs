// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Mutual exclusion selectable at construction.
//!
//! [`SwitchMutex`] owns the protected value and storage for both concrete
//! locks; the mode picks which one `lock` dispatches to for the instance's
//! lifetime. Closure-based access — no guard objects, no escaping
//! references.

use std::cell::UnsafeCell;
use std::sync::{Mutex, PoisonError};

use crate::spin::SpinLock;

/// Which lock implementation a [`SwitchMutex`] dispatches to. Fixed at
/// construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockMode {
    /// No synchronization at all. Only sound when the caller guarantees
    /// that no two threads ever access the value at the same time.
    None,
    /// Busy-wait on a [`SpinLock`]. For critical sections of a few
    /// instructions under brief contention.
    Spin,
    /// Block on a `std::sync::Mutex`. For longer waits or many
    /// contending threads.
    Blocking,
}

/// Exclusive-access wrapper dispatching on a [`LockMode`].
///
/// Both lock implementations are stored; only the one selected by the
/// mode is ever used. Changing strategy after construction is not
/// possible.
pub struct SwitchMutex<T> {
    mode: LockMode,
    spin: SpinLock,
    blocking: Mutex<()>,
    value: UnsafeCell<T>,
}

impl<T> SwitchMutex<T> {
    pub fn new(mode: LockMode, value: T) -> Self {
        Self {
            mode,
            spin: SpinLock::new(),
            blocking: Mutex::new(()),
            value: UnsafeCell::new(value),
        }
    }

    /// The mode selected at construction.
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Acquire exclusive access per the mode and run `f`.
    ///
    /// In `LockMode::None` this performs zero synchronization; the caller
    /// owns the exclusivity guarantee and concurrent access is undefined
    /// behavior.
    pub fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        match self.mode {
            LockMode::Blocking => {
                // Recover from poison — lock state stays consistent, the
                // protected value is handed back to the closure either way.
                let _guard = self
                    .blocking
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                // Safety: the std mutex is held for the closure's duration.
                f(unsafe { &mut *self.value.get() })
            }
            LockMode::Spin => {
                self.spin.lock();
                let _release = SpinRelease(&self.spin);
                // Safety: the spin lock is held until `_release` drops,
                // including on unwind.
                f(unsafe { &mut *self.value.get() })
            }
            LockMode::None => {
                // Safety: exclusivity is the caller's contract in this mode.
                f(unsafe { &mut *self.value.get() })
            }
        }
    }
}

/// Releases the spin lock on drop so a panicking closure can't leave it
/// held.
struct SpinRelease<'a>(&'a SpinLock);

impl Drop for SpinRelease<'_> {
    fn drop(&mut self) {
        self.0.unlock();
    }
}

// Safety: T: Send required. Spin and Blocking modes serialize all access
// through their lock; None mode shifts that obligation to the caller.
unsafe impl<T: Send> Send for SwitchMutex<T> {}
unsafe impl<T: Send> Sync for SwitchMutex<T> {}
