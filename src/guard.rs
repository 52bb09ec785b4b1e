//! Per-device exclusion guard.
//!
//! Temperature and humidity share one ADC, so a configure/poll/read sequence
//! must not interleave with another. The guard owns the register protocol; the
//! only way to reach the bus is through the permit returned by
//! [`ExclusionGuard::lock`], and dropping the permit releases the device on
//! every exit path.
//!
//! Waiters are queued in arrival order by `tokio::sync::Mutex`. There is no
//! timeout and no priority.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Exclusive access to one device's state.
pub type ExclusionPermit<'a, T> = MutexGuard<'a, T>;

/// One blocking mutual-exclusion lock per device.
#[derive(Debug)]
pub struct ExclusionGuard<T> {
    inner: Mutex<T>,
    waiting: AtomicUsize,
}

impl<T> ExclusionGuard<T> {
    /// Guard `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Wait until no other acquisition holds the device.
    pub async fn lock(&self) -> ExclusionPermit<'_, T> {
        let started = Instant::now();
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = self.inner.lock().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        trace!(waited_us = started.elapsed().as_micros() as u64, "exclusion lock acquired");
        permit
    }

    /// Take the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<ExclusionPermit<'_, T>> {
        self.inner.try_lock().ok()
    }

    /// Callers currently queued in [`ExclusionGuard::lock`].
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Unwrap the guarded value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
