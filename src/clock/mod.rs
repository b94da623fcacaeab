//! Monotonic time sources.
//!
//! The engine has a single time reference: a [`MonoClock`] handed in at
//! construction. Timestamps only ever move forward, which makes them safe
//! for cooldown and exemption arithmetic regardless of wall-clock
//! adjustments. Tests use [`MockClock`] to step time deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use crate::constants::NANOS_PER_MILLI;

/// A strictly non-decreasing nanosecond time source.
pub trait MonoClock: Send + Sync {
    /// Current monotonic time in nanoseconds, relative to an arbitrary
    /// origin. Only differences between two readings are meaningful.
    fn nano_time(&self) -> i64;

    /// Current monotonic time in milliseconds.
    fn milli_time(&self) -> i64 {
        self.nano_time() / NANOS_PER_MILLI
    }
}

/// Production clock backed by the host monotonic source, anchored at
/// construction so readings start near zero.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoClock for SystemClock {
    fn nano_time(&self) -> i64 {
        self.origin.elapsed().as_nanos() as i64
    }
}

/// Controllable clock for deterministic tests.
///
/// Shared freely between the engine and the test body; `advance`/`set`
/// take `&self` so an `Arc<MockClock>` can be stepped mid-scenario.
pub struct MockClock {
    nanos: AtomicI64,
}

impl MockClock {
    pub fn new(initial_nanos: i64) -> Self {
        Self {
            nanos: AtomicI64::new(initial_nanos),
        }
    }

    /// Advances the clock and returns the new time.
    pub fn advance(&self, nanos: i64) -> i64 {
        self.nanos.fetch_add(nanos, Ordering::SeqCst) + nanos
    }

    /// Advances the clock by whole milliseconds.
    pub fn advance_millis(&self, millis: i64) -> i64 {
        self.advance(millis * NANOS_PER_MILLI)
    }

    /// Sets the clock to an absolute value.
    pub fn set(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }
}

impl MonoClock for MockClock {
    fn nano_time(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }
}
