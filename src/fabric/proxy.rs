//! Per-kind coalescing of pending notifications.
//!
//! A proxy owns one pending-call slot per group. `update` swaps the slot
//! with the newest call; only the empty-to-pending transition posts a work
//! unit, so each group has at most one coalesced delivery in flight, and
//! the work unit executes whatever call the slot holds when it runs. A
//! burst of updates between two drains therefore collapses into a single
//! delivery of the most recent call.

use crate::fabric::call::Call;
use crate::fabric::group::Group;
use crate::queue::Work;
use crate::types::{Tick, UpdateKey};
use parking_lot::Mutex;
use std::sync::Arc;

struct SubEntry<L: ?Sized> {
    group: Arc<Group<L>>,
    /// Latest pending call for this group, or `None` when no coalesced
    /// delivery is in flight.
    pending: Mutex<Option<Call<L>>>,
}

/// Coalescing slot for one notification kind of one publisher.
pub(crate) struct Proxy<L: ?Sized> {
    key: UpdateKey,
    entries: Mutex<Vec<Arc<SubEntry<L>>>>,
}

impl<L: ?Sized + Send + Sync + 'static> Proxy<L> {
    pub(crate) fn new(key: UpdateKey) -> Self {
        Self {
            key,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn matches(&self, key: &UpdateKey) -> bool {
        self.key == *key
    }

    /// Track `group` in this proxy. Idempotent.
    pub(crate) fn enroll(&self, group: &Arc<Group<L>>) {
        let mut entries = self.entries.lock();
        if !entries.iter().any(|e| Arc::ptr_eq(&e.group, group)) {
            entries.push(Arc::new(SubEntry {
                group: Arc::clone(group),
                pending: Mutex::new(None),
            }));
        }
    }

    /// Stop tracking `group`, releasing any call still parked for it.
    ///
    /// A work unit already posted for the group may still hold the
    /// sub-entry; clearing the slot here turns that work into a no-op.
    pub(crate) fn expel(&self, group: &Arc<Group<L>>) {
        self.entries.lock().retain(|e| {
            if Arc::ptr_eq(&e.group, group) {
                e.pending.lock().take();
                false
            } else {
                true
            }
        });
    }

    /// Replace each group's pending call with `call`.
    ///
    /// `tick` was taken when the update was issued; the work unit it posts
    /// delivers with that tick even if a newer update later replaces the
    /// call it will pick up.
    pub(crate) fn update(&self, call: &Call<L>, tick: Tick) {
        let entries: Vec<Arc<SubEntry<L>>> = self.entries.lock().iter().map(Arc::clone).collect();

        for entry in entries {
            let previous = entry.pending.lock().replace(call.clone());
            if previous.is_some() {
                // Replaced in place; the already-posted work unit will pick
                // up the newer call. The previous one is released unrun.
                continue;
            }
            let slot = Arc::clone(&entry);
            let group = Arc::clone(&entry.group);
            let work: Work = Box::new(move || {
                let latest = slot.pending.lock().take();
                if let Some(latest) = latest {
                    group.deliver(&latest, tick);
                }
            });
            if !entry.group.queue().post(work) {
                // Closed queue: clear the slot so the call is released
                // rather than parked forever.
                entry.pending.lock().take();
            }
        }
    }
}
