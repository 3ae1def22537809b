// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Threadmill runtime library.
//!
//! A single-consumer background execution primitive: one long-lived OS
//! thread per [`Worker`], sleeping on a wake flag until signaled, running
//! one unit of work per wake. [`WorkQueue`] layers a FIFO job queue on
//! top and hands each caller a [`JobHandle`] to the eventual result.
//!
//! Components:
//! - spin — busy-wait lock for short critical sections
//! - strategy — mutual exclusion selectable at construction (none/spin/blocking)
//! - worker — wake/sleep/terminate lifecycle around one OS thread
//! - queue — FIFO job queue driven by a worker
//! - handle — caller-facing result handles
//!
//! Logging goes through `tracing`; consumers wire up their own subscriber.

pub mod handle;
pub mod queue;
pub mod spin;
pub mod strategy;
pub mod worker;

pub use handle::{JobError, JobHandle};
pub use queue::WorkQueue;
pub use spin::SpinLock;
pub use strategy::{LockMode, SwitchMutex};
pub use worker::{WakeToken, Worker};
