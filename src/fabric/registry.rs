//! The publisher core: subscriber groups, coalescing proxies, and the
//! visibility clock.
//!
//! One `Registry` per observed subject. Subscribers land in one `Group`
//! per call queue; coalesced publishes route through one `Proxy` per
//! notification kind. The tick counter orders broadcasts against
//! registrations: a subscriber added at tick `a` receives exactly the
//! broadcasts whose tick is strictly greater than `a`.
//!
//! Lock order, crate-wide: groups set, then proxies set, then a proxy's
//! sub-entries, then a group's entries. `update` releases the proxies
//! write lock before touching the groups lock and re-enrolls idempotently,
//! which keeps that order acyclic. Subscriber code only ever runs after
//! every publisher lock has been released on the publishing thread.

use crate::error::Result;
use crate::fabric::call::Call;
use crate::fabric::group::Group;
use crate::fabric::proxy::Proxy;
use crate::pool::CallPool;
use crate::queue::CallQueue;
use crate::types::{listener_key, Tick, UpdateKey};
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Publisher state for one observed subject.
///
/// This is the call-level core; [`Listeners`](crate::Listeners) wraps it
/// with the closure-binding API. It is exposed for callers that want to
/// build a [`Call`] once and publish it repeatedly.
pub struct Registry<L: ?Sized> {
    groups: CachePadded<RwLock<Vec<Arc<Group<L>>>>>,
    proxies: CachePadded<RwLock<Vec<Arc<Proxy<L>>>>>,
    tick: CachePadded<AtomicU64>,
    pool: CallPool,
}

impl<L: ?Sized + Send + Sync + 'static> Registry<L> {
    pub fn new() -> Self {
        Self::with_pool(CallPool::default())
    }

    pub fn with_pool(pool: CallPool) -> Self {
        Self {
            groups: CachePadded::new(RwLock::new(Vec::new())),
            proxies: CachePadded::new(RwLock::new(Vec::new())),
            tick: CachePadded::new(AtomicU64::new(0)),
            pool,
        }
    }

    /// Build a call, reserving admission from the pool.
    pub fn make_call<F>(&self, notify: F) -> Result<Call<L>>
    where
        F: Fn(&L) + Send + Sync + 'static,
    {
        Ok(Call::new(self.pool.reserve()?, notify))
    }

    /// Register `listener` to be notified on `queue`.
    ///
    /// The listener is recorded with the current tick, so it will observe
    /// every broadcast issued after this call returns and none issued
    /// before. Registering the same listener twice on one publisher is a
    /// contract violation, as is registering on a closed queue.
    pub fn add(&self, listener: &Arc<L>, queue: &Arc<dyn CallQueue>) {
        debug_assert!(!queue.is_closed(), "subscriber added on a closed call queue");
        let key = listener_key(listener);

        let mut groups = self.groups.write();
        debug_assert!(
            !groups.iter().any(|g| g.contains(key)),
            "subscriber registered twice on the same publisher"
        );

        let group = match groups.iter().find(|g| g.serves(queue)) {
            Some(existing) => Arc::clone(existing),
            None => {
                let created = Arc::new(Group::new(Arc::clone(queue)));
                groups.push(Arc::clone(&created));
                created
            }
        };

        let added_at = Tick(self.tick.load(Ordering::Acquire));
        group.add(listener, key, added_at);

        // Future coalesced publishes must reach this group too.
        for proxy in self.proxies.read().iter() {
            proxy.enroll(&group);
        }

        log::debug!("subscriber {:#x} added at tick {}", key, added_at);
    }

    /// Unregister `listener`.
    ///
    /// After this returns, the listener is not invoked again: pending work
    /// units re-check membership before invoking. An invocation already
    /// executing on another thread may complete. Legal from any thread,
    /// including from inside the listener's own notification.
    pub fn remove(&self, listener: &Arc<L>) {
        let key = listener_key(listener);

        let mut groups = self.groups.write();
        // Group::remove reports whether the entry lived there, so the scan
        // stops at the owning group.
        let owner = groups.iter().position(|g| g.remove(key));
        debug_assert!(
            owner.is_some(),
            "subscriber was not registered on this publisher"
        );

        let mut emptied = None;
        if let Some(index) = owner {
            if groups[index].is_empty() {
                emptied = Some(groups.remove(index));
            }
        }

        if let Some(group) = emptied {
            for proxy in self.proxies.read().iter() {
                proxy.expel(&group);
            }
        }

        log::debug!("subscriber {:#x} removed", key);
    }

    /// Broadcast `call`, then drain any queue serviced by this thread.
    pub fn call(&self, call: Call<L>) {
        let mut inline: Vec<Arc<dyn CallQueue>> = Vec::new();
        {
            let groups = self.groups.read();
            let tick = self.advance_clock();
            for group in groups.iter() {
                Arc::clone(group).post_broadcast(call.clone(), tick);
                if group.queue().is_on_servicing_thread() {
                    inline.push(Arc::clone(group.queue()));
                }
            }
        }
        // Subscriber code runs only after the groups lock is released.
        for queue in inline {
            queue.synchronize();
        }
    }

    /// Broadcast `call` without draining any queue.
    pub fn queue(&self, call: Call<L>) {
        let groups = self.groups.read();
        let tick = self.advance_clock();
        for group in groups.iter() {
            Arc::clone(group).post_broadcast(call.clone(), tick);
        }
    }

    /// Publish `call` to `listener` alone, then drain its queue if this
    /// thread services it. Targeting an unregistered listener releases the
    /// call without delivery.
    pub fn call1(&self, listener: &Arc<L>, call: Call<L>) {
        if let Some(queue) = self.post_targeted(listener, call) {
            if queue.is_on_servicing_thread() {
                queue.synchronize();
            }
        }
    }

    /// Publish `call` to `listener` alone, without draining.
    pub fn queue1(&self, listener: &Arc<L>, call: Call<L>) {
        self.post_targeted(listener, call);
    }

    /// Coalesced publish: replace any pending call of the same `key`.
    ///
    /// Per call queue, a burst of updates between two drains produces one
    /// delivery carrying the most recent call. Never drains, even on the
    /// servicing thread.
    pub fn update(&self, key: UpdateKey, call: Call<L>) {
        let proxy = {
            let mut proxies = self.proxies.write();
            match proxies.iter().find(|p| p.matches(&key)) {
                Some(existing) => Arc::clone(existing),
                None => {
                    let created = Arc::new(Proxy::new(key));
                    proxies.push(Arc::clone(&created));
                    created
                }
            }
        };

        let tick = self.advance_clock();
        let groups = self.groups.read();
        // A proxy created by this publish has not seen any group yet, and
        // a group created since the proxy may have raced its enrollment;
        // enrolling here is idempotent either way.
        for group in groups.iter() {
            proxy.enroll(group);
        }
        proxy.update(&call, tick);
    }

    /// Number of registered subscribers across all queues.
    pub fn subscriber_count(&self) -> usize {
        self.groups.read().iter().map(|g| g.len()).sum()
    }

    /// Current position of the visibility clock.
    pub fn clock(&self) -> Tick {
        Tick(self.tick.load(Ordering::Acquire))
    }

    fn post_targeted(&self, listener: &Arc<L>, call: Call<L>) -> Option<Arc<dyn CallQueue>> {
        let key = listener_key(listener);
        let groups = self.groups.read();
        let tick = Tick(self.tick.load(Ordering::Acquire));
        let group = groups.iter().find(|g| g.contains(key))?;
        Arc::clone(group).post_targeted(call, tick, key);
        Some(Arc::clone(group.queue()))
    }

    fn advance_clock(&self) -> Tick {
        Tick(self.tick.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

impl<L: ?Sized + Send + Sync + 'static> Default for Registry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Drop for Registry<L> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        debug_assert!(
            self.groups.read().is_empty(),
            "publisher dropped while subscribers are still registered"
        );
    }
}
