//! Integration tests for broadcast, targeted, and lifecycle behavior.

use fanout::{CallQueue, Error, Listeners, ManualQueue};
use parking_lot::Mutex;
use std::sync::Arc;

trait Listener: Send + Sync {
    fn on_event(&self, value: i32);
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<i32>>,
}

impl Listener for Recorder {
    fn on_event(&self, value: i32) {
        self.seen.lock().push(value);
    }
}

fn manual() -> Arc<dyn CallQueue> {
    Arc::new(ManualQueue::new())
}

fn recorder() -> (Arc<Recorder>, Arc<dyn Listener>) {
    let rec = Arc::new(Recorder::default());
    let listener: Arc<dyn Listener> = rec.clone();
    (rec, listener)
}

#[test]
fn test_sequential_broadcast() {
    let fabric = Listeners::<dyn Listener>::new();
    let queue = manual();
    let (rec1, s1) = recorder();
    let (rec2, s2) = recorder();
    fabric.add(&s1, &queue);
    fabric.add(&s2, &queue);

    for value in 1..=3 {
        fabric.queue(move |l| l.on_event(value)).unwrap();
    }
    queue.synchronize();

    assert_eq!(*rec1.seen.lock(), vec![1, 2, 3]);
    assert_eq!(*rec2.seen.lock(), vec![1, 2, 3]);

    fabric.remove(&s1);
    fabric.remove(&s2);
}

#[test]
fn test_late_join_sees_only_later_broadcasts() {
    let fabric = Listeners::<dyn Listener>::new();
    let queue = manual();
    let (rec1, s1) = recorder();
    let (rec2, s2) = recorder();

    fabric.add(&s1, &queue);
    fabric.queue(|l| l.on_event(1)).unwrap();
    fabric.add(&s2, &queue);
    fabric.queue(|l| l.on_event(2)).unwrap();
    queue.synchronize();

    assert_eq!(*rec1.seen.lock(), vec![1, 2]);
    assert_eq!(*rec2.seen.lock(), vec![2]);

    fabric.remove(&s1);
    fabric.remove(&s2);
}

#[test]
fn test_targeted_while_removed_is_dropped() {
    let fabric = Listeners::<dyn Listener>::new();
    let queue = manual();
    let (rec, s) = recorder();

    fabric.add(&s, &queue);
    fabric.remove(&s);
    fabric.call1(&s, |l| l.on_event(9)).unwrap();
    queue.synchronize();

    assert!(rec.seen.lock().is_empty());
}

#[test]
fn test_targeted_delivery() {
    let fabric = Listeners::<dyn Listener>::new();
    let queue = manual();
    let (rec, s) = recorder();
    fabric.add(&s, &queue);

    // Targeted publishes compare against the tick current at registration;
    // a broadcast first moves the clock past it.
    fabric.queue(|l| l.on_event(1)).unwrap();
    fabric.queue1(&s, |l| l.on_event(9)).unwrap();
    queue.synchronize();

    assert_eq!(*rec.seen.lock(), vec![1, 9]);
    fabric.remove(&s);
}

#[test]
fn test_targeted_before_any_broadcast_is_dropped() {
    let fabric = Listeners::<dyn Listener>::new();
    let queue = manual();
    let (rec, s) = recorder();
    fabric.add(&s, &queue);

    // The clock has never advanced past the registration tick.
    fabric.queue1(&s, |l| l.on_event(9)).unwrap();
    queue.synchronize();

    assert!(rec.seen.lock().is_empty());
    fabric.remove(&s);
}

// --- Self-removal during delivery ---

struct Quitter {
    fabric: Arc<Listeners<dyn Listener>>,
    myself: Mutex<Option<Arc<dyn Listener>>>,
    victim: Mutex<Option<Arc<dyn Listener>>>,
    seen: Mutex<Vec<i32>>,
}

impl Listener for Quitter {
    fn on_event(&self, value: i32) {
        self.seen.lock().push(value);
        if let Some(me) = self.myself.lock().take() {
            self.fabric.remove(&me);
        }
        if let Some(victim) = self.victim.lock().take() {
            self.fabric.remove(&victim);
        }
    }
}

#[test]
fn test_self_remove_during_delivery() {
    let fabric = Arc::new(Listeners::<dyn Listener>::new());
    let queue = manual();
    let (rec2, s2) = recorder();

    let quitter = Arc::new(Quitter {
        fabric: Arc::clone(&fabric),
        myself: Mutex::new(None),
        victim: Mutex::new(Some(s2.clone())),
        seen: Mutex::new(Vec::new()),
    });
    let s1: Arc<dyn Listener> = quitter.clone();
    *quitter.myself.lock() = Some(s1.clone());

    fabric.add(&s1, &queue);
    fabric.add(&s2, &queue);

    fabric.queue(|l| l.on_event(1)).unwrap();
    queue.synchronize();

    // The quitter ran once and removed both registrations before the
    // second entry's turn came up.
    assert_eq!(*quitter.seen.lock(), vec![1]);
    assert!(rec2.seen.lock().is_empty());
    assert_eq!(fabric.subscriber_count(), 0);

    // Nothing further reaches either of them.
    fabric.queue(|l| l.on_event(2)).unwrap();
    queue.synchronize();
    assert_eq!(*quitter.seen.lock(), vec![1]);
    assert!(rec2.seen.lock().is_empty());
}

#[test]
fn test_call_drains_inline_on_servicing_thread() {
    let fabric = Listeners::<dyn Listener>::new();
    // The creating thread services a manual queue, so this test thread is
    // the servicing thread.
    let queue = manual();
    let (rec, s) = recorder();
    fabric.add(&s, &queue);

    fabric.call(|l| l.on_event(1)).unwrap();
    // Delivered before call() returned, with no explicit drain.
    assert_eq!(*rec.seen.lock(), vec![1]);

    fabric.remove(&s);
}

#[test]
fn test_queue_never_drains_inline() {
    let fabric = Listeners::<dyn Listener>::new();
    let queue = manual();
    let (rec, s) = recorder();
    fabric.add(&s, &queue);

    fabric.queue(|l| l.on_event(1)).unwrap();
    assert!(rec.seen.lock().is_empty());

    queue.synchronize();
    assert_eq!(*rec.seen.lock(), vec![1]);

    fabric.remove(&s);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "registered twice")]
fn test_double_add_panics() {
    let fabric = Listeners::<dyn Listener>::new();
    let queue = manual();
    let (_rec, s) = recorder();
    fabric.add(&s, &queue);
    fabric.add(&s, &queue);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "not registered")]
fn test_remove_unknown_panics() {
    let fabric = Listeners::<dyn Listener>::new();
    let (_rec, s) = recorder();
    fabric.remove(&s);
}

#[test]
fn test_closed_queue_discards_notifications() {
    let fabric = Listeners::<dyn Listener>::new();
    let queue = Arc::new(ManualQueue::new());
    let erased: Arc<dyn CallQueue> = queue.clone();
    let (rec, s) = recorder();
    fabric.add(&s, &erased);

    // The user contract is remove-before-close; if it is broken, posted
    // work is silently dropped rather than leaked or executed.
    queue.close();
    fabric.queue(|l| l.on_event(1)).unwrap();
    assert_eq!(queue.pending(), 0);
    assert!(rec.seen.lock().is_empty());

    fabric.remove(&s);
}

#[test]
fn test_pool_exhaustion_fails_publish_loudly() {
    let fabric = Listeners::<dyn Listener>::with_call_capacity(1);
    let queue = manual();
    let (rec, s) = recorder();
    fabric.add(&s, &queue);

    fabric.queue(|l| l.on_event(1)).unwrap();
    match fabric.queue(|l| l.on_event(2)) {
        Err(Error::PoolExhausted { live, capacity }) => {
            assert_eq!(live, 1);
            assert_eq!(capacity, 1);
        }
        Ok(()) => panic!("publish succeeded past pool capacity"),
    }

    // The failed publish left no trace; draining frees the pool again.
    queue.synchronize();
    assert_eq!(*rec.seen.lock(), vec![1]);
    fabric.queue(|l| l.on_event(3)).unwrap();
    queue.synchronize();
    assert_eq!(*rec.seen.lock(), vec![1, 3]);

    fabric.remove(&s);
}
