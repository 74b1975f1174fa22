//! Reference-counted, type-erased notification objects.

use crate::pool::PoolSlot;
use std::sync::Arc;

/// A single notification, immutable after construction.
///
/// A `Call` wraps the invocation to run against each eligible subscriber
/// and the pool reservation that admitted it. Clones share the same
/// underlying call; the reservation is released when the last clone drops.
pub struct Call<L: ?Sized> {
    inner: Arc<Inner<L>>,
}

struct Inner<L: ?Sized> {
    thunk: Box<dyn Fn(&L) + Send + Sync>,
    _slot: PoolSlot,
}

impl<L: ?Sized> Call<L> {
    pub(crate) fn new<F>(slot: PoolSlot, notify: F) -> Self
    where
        F: Fn(&L) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                thunk: Box::new(notify),
                _slot: slot,
            }),
        }
    }

    /// Issue the notification against one subscriber.
    pub fn invoke(&self, listener: &L) {
        (self.inner.thunk)(listener)
    }
}

impl<L: ?Sized> Clone for Call<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
