//! # fanout
//!
//! Typed concurrent listener notifications delivered on per-thread call
//! queues.
//!
//! A [`Listeners`] publisher holds a set of subscribers, each of which
//! picked its own [`CallQueue`] (a FIFO serial executor pinned to one
//! servicing thread) at registration time. Publishing never blocks on
//! subscriber code: every notification is marshalled onto each
//! subscriber's queue and runs when that queue drains on its own thread.
//!
//! ## Core Concepts
//!
//! - **As-of-add visibility**: a subscriber observes every broadcast issued
//!   after its `add` returns, and none issued before
//! - **Per-queue ordering**: broadcasts reach each subscriber in publish
//!   order; queues are independent of each other
//! - **Inline drain**: [`Listeners::call`] notifies same-thread subscribers
//!   before it returns; [`Listeners::queue`] never does
//! - **Coalescing**: [`Listeners::update`] collapses redundant pending
//!   notifications of one kind into the most recent one, per queue
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fanout::{CallQueue, Listeners, ManualQueue, UpdateKey};
//!
//! // The audio thread publishes; the GUI thread drains its own queue.
//! let gui_queue: Arc<dyn CallQueue> = Arc::new(ManualQueue::new());
//! let listeners: Listeners<dyn MeterListener> = Listeners::new();
//!
//! listeners.add(&vu_meter, &gui_queue);
//!
//! // On every block: at most one pending level notification per queue.
//! listeners.update(UpdateKey::named("level"), move |l| l.on_level(peak))?;
//!
//! // GUI tick:
//! gui_queue.synchronize();
//! ```
//!
//! Subscribers manage their own lifetime: remove a listener before
//! dropping it, and before closing its call queue.

pub mod error;
pub mod fabric;
pub mod pool;
pub mod queue;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use fabric::{Call, Listeners, Registry};
pub use pool::{CallPool, PoolSlot, DEFAULT_CALL_CAPACITY};
pub use queue::{CallQueue, ManualQueue, Work};
pub use types::{Tick, UpdateKey, MAX_UPDATE_KEY_BYTES};
