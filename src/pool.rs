//! Bounded admission pool for in-flight calls.
//!
//! The allocation and reference counting of a [`Call`](crate::Call) ride
//! `Arc`; what the pool bounds is how many calls a publisher may have in
//! flight at once. Hitting the cap fails the publish loudly and leaves
//! publisher state untouched.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default cap on in-flight calls per publisher.
pub const DEFAULT_CALL_CAPACITY: usize = 65_536;

struct PoolShared {
    live: AtomicUsize,
    capacity: usize,
}

/// Admission pool handed one [`PoolSlot`] per live call.
pub struct CallPool {
    shared: Arc<PoolShared>,
}

/// Reservation for one in-flight call. Dropping it releases the reservation.
pub struct PoolSlot {
    shared: Arc<PoolShared>,
}

impl CallPool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                live: AtomicUsize::new(0),
                capacity,
            }),
        }
    }

    /// Reserve admission for one call.
    pub fn reserve(&self) -> Result<PoolSlot> {
        let mut live = self.shared.live.load(Ordering::Relaxed);
        loop {
            if live >= self.shared.capacity {
                log::warn!(
                    "call pool exhausted: {} in flight (capacity {})",
                    live,
                    self.shared.capacity
                );
                return Err(Error::PoolExhausted {
                    live,
                    capacity: self.shared.capacity,
                });
            }
            match self.shared.live.compare_exchange_weak(
                live,
                live + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Ok(PoolSlot {
                        shared: Arc::clone(&self.shared),
                    })
                }
                Err(current) => live = current,
            }
        }
    }

    /// Calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

impl Default for CallPool {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CALL_CAPACITY)
    }
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::AcqRel);
    }
}
