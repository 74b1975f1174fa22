//! The call-queue abstraction the fabric delivers through.
//!
//! A call queue is a FIFO serial executor pinned to one servicing thread at
//! a time. The fabric only consumes the [`CallQueue`] trait; [`ManualQueue`]
//! is the reference implementation, drained explicitly by whichever thread
//! services it. Richer executors (a GUI message pump, a worker thread) can
//! implement the same trait.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

/// A unit of work posted onto a call queue.
pub type Work = Box<dyn FnOnce() + Send>;

/// Serial work queue contract consumed by the notification fabric.
///
/// Implementations must preserve FIFO order between `post` and execution,
/// and must discard (dropping all captured references) any work posted
/// after the queue has closed.
pub trait CallQueue: Send + Sync {
    /// Enqueue a unit of work.
    ///
    /// Returns `false` if the queue is closed; the work is dropped.
    fn post(&self, work: Work) -> bool;

    /// True if the current thread is the queue's servicing thread.
    fn is_on_servicing_thread(&self) -> bool;

    /// Drain all pending work now. Only legal on the servicing thread.
    ///
    /// Returns the number of work units executed.
    fn synchronize(&self) -> usize;

    /// True once the queue has been closed.
    fn is_closed(&self) -> bool;
}

/// A manually drained call queue.
///
/// The creating thread is the initial servicing thread. Any thread that
/// calls [`synchronize`](CallQueue::synchronize) takes over servicing from
/// then on; the servicing thread may change across the queue's lifetime but
/// must never change during a single drain (caller contract).
pub struct ManualQueue {
    tx: Sender<Work>,
    rx: Receiver<Work>,
    serving: Mutex<Option<ThreadId>>,
    closed: AtomicBool,
}

impl ManualQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            serving: Mutex::new(Some(thread::current().id())),
            closed: AtomicBool::new(false),
        }
    }

    /// Close the queue. Pending and future work is dropped.
    ///
    /// Subscribers registered on this queue must be removed from their
    /// publishers before closing; work posted afterwards is silently
    /// discarded.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.purge();
    }

    /// Number of work units waiting to be drained.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn purge(&self) {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            log::debug!("call queue closed, dropped {} pending work units", dropped);
        }
    }
}

impl Default for ManualQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CallQueue for ManualQueue {
    fn post(&self, work: Work) -> bool {
        if self.is_closed() {
            drop(work);
            return false;
        }
        // The receiver lives in `self`, so send cannot fail.
        let _ = self.tx.send(work);
        true
    }

    fn is_on_servicing_thread(&self) -> bool {
        *self.serving.lock() == Some(thread::current().id())
    }

    fn synchronize(&self) -> usize {
        if self.is_closed() {
            self.purge();
            return 0;
        }
        *self.serving.lock() = Some(thread::current().id());
        let mut executed = 0;
        while let Ok(work) = self.rx.try_recv() {
            work();
            executed += 1;
        }
        executed
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
