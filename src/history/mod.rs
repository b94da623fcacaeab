//! Fixed-capacity history primitives.
//!
//! Every per-player statistic the checks consume comes from one of three
//! structures:
//! - [`RingBuffer`]: recent typed events, indexed by age (0 = newest)
//! - [`RollingWindow`]: recent samples with robust O(n) statistics
//! - [`Ewma`]: exponentially weighted moving average
//!
//! None of these allocate after construction. Windows and EWMAs are owned
//! by a single player context and are not thread-safe; the context's
//! ingest owner is the only writer.

use std::collections::VecDeque;

use crate::stats;

/// Fixed-size ring buffer with O(1) push and indexed access by age.
///
/// When full, a push discards the oldest element. `get(0)` is always the
/// most recently pushed value.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds an element, overwriting the oldest when at capacity.
    pub fn push(&mut self, element: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(element);
    }

    /// The most recently pushed element.
    pub fn peek(&self) -> Option<&T> {
        self.buf.back()
    }

    /// The element `age` positions behind the newest (age 0 = newest).
    pub fn get(&self, age: usize) -> Option<&T> {
        if age >= self.buf.len() {
            return None;
        }
        self.buf.get(self.buf.len() - 1 - age)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Snapshot of all elements, oldest to newest. The snapshot is
    /// unaffected by pushes that happen after it is taken.
    pub fn to_vec(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }

    /// Iterates stored elements oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

/// Fixed-capacity circular buffer of samples with O(n) statistics.
///
/// All statistics are computed over currently stored values only; an
/// empty window reports 0 for every statistic.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Snapshot of stored samples, oldest to newest.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn median(&self) -> f64 {
        stats::median(&self.to_vec())
    }

    pub fn mad(&self) -> f64 {
        stats::mad(&self.to_vec())
    }

    pub fn mean(&self) -> f64 {
        stats::mean(&self.to_vec())
    }

    pub fn std_dev(&self) -> f64 {
        stats::std_dev(&self.to_vec())
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.min(v)))
        })
        .unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        })
        .unwrap_or(0.0)
    }
}

/// Exponentially weighted moving average with smoothing factor alpha.
///
/// The first update seeds the value exactly; later updates blend with
/// `alpha * new + (1 - alpha) * value`. Uninitialized reads return 0.
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    value: f64,
    initialized: bool,
}

impl Ewma {
    /// Creates an EWMA tracker. Alpha is clamped into (0, 1].
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 {
            alpha.min(1.0)
        } else {
            1.0
        };
        Self {
            alpha,
            value: 0.0,
            initialized: false,
        }
    }

    /// Feeds a new observation and returns the updated average.
    pub fn update(&mut self, new_value: f64) -> f64 {
        if self.initialized {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        } else {
            self.value = new_value;
            self.initialized = true;
        }
        self.value
    }

    /// Current smoothed value, or 0 before the first update.
    pub fn get(&self) -> f64 {
        if self.initialized {
            self.value
        } else {
            0.0
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.initialized = false;
    }
}
