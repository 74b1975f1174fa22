//! Typed facade over the publisher core.

use crate::error::Result;
use crate::fabric::registry::Registry;
use crate::pool::CallPool;
use crate::queue::CallQueue;
use crate::types::UpdateKey;
use std::sync::Arc;

/// A group of concurrent listeners, each notified on its own call queue.
///
/// `L` is the listener interface, usually a trait object. Publish
/// operations capture a closure over `&L` plus any bound arguments by
/// value; delivery happens when each subscriber's queue drains on its
/// servicing thread.
///
/// ```
/// use std::sync::Arc;
/// use fanout::{CallQueue, Listeners, ManualQueue};
///
/// trait EngineListener: Send + Sync {
///     fn on_output_level(&self, level: f32);
/// }
///
/// struct Meter;
/// impl EngineListener for Meter {
///     fn on_output_level(&self, _level: f32) {}
/// }
///
/// let queue: Arc<dyn CallQueue> = Arc::new(ManualQueue::new());
/// let listeners: Listeners<dyn EngineListener> = Listeners::new();
///
/// let meter: Arc<dyn EngineListener> = Arc::new(Meter);
/// listeners.add(&meter, &queue);
///
/// // Publish from any thread; delivery happens when the queue drains.
/// listeners.call(|l| l.on_output_level(0.8)).unwrap();
/// queue.synchronize();
///
/// listeners.remove(&meter);
/// ```
pub struct Listeners<L: ?Sized> {
    registry: Registry<L>,
}

impl<L: ?Sized + Send + Sync + 'static> Listeners<L> {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Cap the number of in-flight calls (default
    /// [`DEFAULT_CALL_CAPACITY`](crate::pool::DEFAULT_CALL_CAPACITY)).
    pub fn with_call_capacity(capacity: usize) -> Self {
        Self {
            registry: Registry::with_pool(CallPool::with_capacity(capacity)),
        }
    }

    /// Register `listener` to receive notifications on `queue`.
    ///
    /// Every broadcast issued after `add` returns reaches the listener;
    /// none issued before does. A listener registers on one publisher at
    /// most once, must be removed before its queue closes, and must not
    /// call `add` on this publisher from inside one of its own
    /// notifications.
    pub fn add(&self, listener: &Arc<L>, queue: &Arc<dyn CallQueue>) {
        self.registry.add(listener, queue);
    }

    /// Unregister `listener`. After this returns it receives nothing
    /// further, including from work already queued. Legal from any thread,
    /// including from inside the listener's own notification.
    pub fn remove(&self, listener: &Arc<L>) {
        self.registry.remove(listener);
    }

    /// Notify every listener; listeners on a queue serviced by this thread
    /// are notified before `call` returns.
    pub fn call<F>(&self, notify: F) -> Result<()>
    where
        F: Fn(&L) + Send + Sync + 'static,
    {
        let call = self.registry.make_call(notify)?;
        self.registry.call(call);
        Ok(())
    }

    /// Notify every listener asynchronously; never drains a queue.
    pub fn queue<F>(&self, notify: F) -> Result<()>
    where
        F: Fn(&L) + Send + Sync + 'static,
    {
        let call = self.registry.make_call(notify)?;
        self.registry.queue(call);
        Ok(())
    }

    /// Notify `listener` alone, draining its queue if this thread services
    /// it. Targeting an unregistered listener is a silent no-op, as is
    /// targeting one whose registration the clock has not yet passed: a
    /// listener is only reachable here once a broadcast issued after its
    /// `add` has advanced the clock.
    pub fn call1<F>(&self, listener: &Arc<L>, notify: F) -> Result<()>
    where
        F: Fn(&L) + Send + Sync + 'static,
    {
        let call = self.registry.make_call(notify)?;
        self.registry.call1(listener, call);
        Ok(())
    }

    /// Notify `listener` alone without draining. Reachability rules as for
    /// [`call1`](Self::call1).
    pub fn queue1<F>(&self, listener: &Arc<L>, notify: F) -> Result<()>
    where
        F: Fn(&L) + Send + Sync + 'static,
    {
        let call = self.registry.make_call(notify)?;
        self.registry.queue1(listener, call);
        Ok(())
    }

    /// Coalesced notify: if a previous update with the same `key` is still
    /// pending on a queue, this one replaces it there instead of queueing
    /// behind it.
    pub fn update<F>(&self, key: UpdateKey, notify: F) -> Result<()>
    where
        F: Fn(&L) + Send + Sync + 'static,
    {
        let call = self.registry.make_call(notify)?;
        self.registry.update(key, call);
        Ok(())
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscriber_count()
    }

    /// The call-level core, for building a [`Call`](crate::Call) once and
    /// publishing it repeatedly.
    pub fn registry(&self) -> &Registry<L> {
        &self.registry
    }
}

impl<L: ?Sized + Send + Sync + 'static> Default for Listeners<L> {
    fn default() -> Self {
        Self::new()
    }
}
