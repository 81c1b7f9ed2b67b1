//! Free-list pool for recycling request, response and client objects.

use std::sync::{Mutex, PoisonError};

/// Types that can be returned to a pristine state for reuse.
pub trait Reset {
    /// Clear all per-use state. After this call the value must behave like
    /// a freshly constructed one.
    fn reset(&mut self);
}

/// Thread-safe pool of reusable values.
///
/// `acquire` hands out a recycled value when one is available and builds a
/// default one otherwise. `release` resets the value before storing it, so a
/// value coming out of the pool never carries state from a previous use.
/// Values beyond the capacity are dropped.
#[derive(Debug)]
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
}

/// Default number of idle values kept by a pool.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

impl<T: Reset + Default> Pool<T> {
    /// Create a pool keeping at most `capacity` idle values.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Take a value out of the pool.
    pub fn acquire(&self) -> T {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    /// Reset a value and give it back to the pool.
    pub fn release(&self, mut value: T) {
        value.reset();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.capacity {
            free.push(value);
        }
    }

    /// Number of idle values.
    pub fn idle(&self) -> usize {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T: Reset + Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}
