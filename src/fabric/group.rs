//! Per-queue subscriber bookkeeping and the delivery loops.
//!
//! A group aggregates every subscriber of one publisher that chose the same
//! call queue. Publish operations post a work unit here; the work executes
//! on the queue's servicing thread and walks the entries through the
//! as-of-add filter.

use crate::fabric::call::Call;
use crate::queue::{CallQueue, Work};
use crate::types::Tick;
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// One registered subscriber: a non-owning back-reference, its registration
/// key, and the publisher tick current when it was added.
struct Entry<L: ?Sized> {
    listener: Weak<L>,
    key: usize,
    added_at: Tick,
}

/// The subscribers of one publisher registered on one call queue.
pub(crate) struct Group<L: ?Sized> {
    queue: Arc<dyn CallQueue>,
    entries: CachePadded<RwLock<Vec<Entry<L>>>>,
}

impl<L: ?Sized + Send + Sync + 'static> Group<L> {
    pub(crate) fn new(queue: Arc<dyn CallQueue>) -> Self {
        Self {
            queue,
            entries: CachePadded::new(RwLock::new(Vec::new())),
        }
    }

    pub(crate) fn serves(&self, queue: &Arc<dyn CallQueue>) -> bool {
        // Compare data pointers only; vtable pointers are not unique.
        Arc::as_ptr(&self.queue).cast::<()>() == Arc::as_ptr(queue).cast::<()>()
    }

    pub(crate) fn queue(&self) -> &Arc<dyn CallQueue> {
        &self.queue
    }

    pub(crate) fn add(&self, listener: &Arc<L>, key: usize, added_at: Tick) {
        self.entries.write().push(Entry {
            listener: Arc::downgrade(listener),
            key,
            added_at,
        });
    }

    /// Remove the entry for `key`. Returns whether it was present.
    ///
    /// Takes effect immediately for any delivery loop still running: the
    /// loop re-checks membership before every invocation.
    pub(crate) fn remove(&self, key: usize) -> bool {
        let mut entries = self.entries.write();
        match entries.iter().position(|e| e.key == key) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, key: usize) -> bool {
        self.entries.read().iter().any(|e| e.key == key)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Post a broadcast work unit carrying `tick`.
    pub(crate) fn post_broadcast(self: Arc<Self>, call: Call<L>, tick: Tick) {
        let queue = Arc::clone(&self.queue);
        let work: Work = Box::new(move || self.deliver(&call, tick));
        if !queue.post(work) {
            log::debug!("broadcast at tick {} dropped: call queue closed", tick);
        }
    }

    /// Post a targeted work unit for the subscriber registered under `key`.
    pub(crate) fn post_targeted(self: Arc<Self>, call: Call<L>, tick: Tick, key: usize) {
        let queue = Arc::clone(&self.queue);
        let work: Work = Box::new(move || self.deliver_one(&call, tick, key));
        if !queue.post(work) {
            log::debug!("targeted call at tick {} dropped: call queue closed", tick);
        }
    }

    /// Invoke `call` against every entry whose tick-at-add precedes `tick`.
    ///
    /// Runs on the servicing thread. Entries are snapshotted up front, then
    /// membership is re-checked under a short read lock before each
    /// invocation, so a removal (by the subscriber itself or by any other
    /// thread) suppresses all later invocations of that subscriber while
    /// the rest of the loop proceeds. No lock is held while subscriber code
    /// runs.
    pub(crate) fn deliver(&self, call: &Call<L>, tick: Tick) {
        let snapshot: Vec<(usize, Tick, Weak<L>)> = self
            .entries
            .read()
            .iter()
            .map(|e| (e.key, e.added_at, Weak::clone(&e.listener)))
            .collect();

        for (key, added_at, weak) in snapshot {
            if added_at >= tick {
                continue;
            }
            if !self.contains(key) {
                continue;
            }
            if let Some(listener) = weak.upgrade() {
                call.invoke(&listener);
            }
        }
    }

    /// Invoke `call` against the single subscriber under `key`, if it is
    /// still registered and its tick-at-add precedes `tick`.
    pub(crate) fn deliver_one(&self, call: &Call<L>, tick: Tick, key: usize) {
        let target = {
            let entries = self.entries.read();
            entries
                .iter()
                .find(|e| e.key == key && e.added_at < tick)
                .and_then(|e| e.listener.upgrade())
        };
        if let Some(listener) = target {
            call.invoke(&listener);
        }
    }
}
