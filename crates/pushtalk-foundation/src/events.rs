//! Minimal typed publisher, used in place of a process-wide
//! annotation-scanned event bus: one [`Publisher<T>`] per event kind,
//! subscriber list fixed at
//! construction, dispatch is a single `Arc` clone plus a linear scan so the
//! hot path (capture worker, engine call, hotkey edge) never allocates.

use parking_lot::RwLock;
use std::sync::Arc;

pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Publisher<T> {
    handlers: RwLock<Arc<Vec<Handler<T>>>>,
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Publisher<T> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Registers a listener. Intended to be called during wiring/construction
    /// only — the copy-on-write swap keeps this safe to call from any
    /// thread, but the design assumes a static subscriber set once the
    /// system is running — there is no runtime discovery.
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) {
        let mut guard = self.handlers.write();
        let mut next = (**guard).clone();
        next.push(Arc::new(handler));
        *guard = Arc::new(next);
    }

    /// Dispatches `event` to every subscriber, in subscription order.
    pub fn publish(&self, event: &T) {
        let handlers = self.handlers.read().clone();
        for handler in handlers.iter() {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatches_to_all_subscribers_in_order() {
        let publisher: Publisher<u32> = Publisher::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let log_a = log.clone();
        publisher.subscribe(move |n: &u32| log_a.lock().push(("a", *n)));
        let log_b = log.clone();
        publisher.subscribe(move |n: &u32| log_b.lock().push(("b", *n)));

        publisher.publish(&7);
        assert_eq!(*log.lock(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn publish_with_no_subscribers_is_a_no_op() {
        let publisher: Publisher<u32> = Publisher::new();
        publisher.publish(&1);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn counts_subscribers() {
        let publisher: Publisher<u32> = Publisher::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = counter.clone();
            publisher.subscribe(move |_| {
                c.fetch_add(1, Ordering::Relaxed);
            });
        }
        assert_eq!(publisher.subscriber_count(), 3);
        publisher.publish(&0);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }
}
