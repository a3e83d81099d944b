//! Bounded, atomically-purgeable inter-stage queue (spec §9 "shared-queue
//! purge", §5 "Queues are multi-producer/single-consumer and must support
//! atomic drain").
//!
//! A plain `tokio::mpsc::channel` cannot be purged atomically mid-flight and
//! has no drop-oldest-on-full policy, so every inter-stage queue (`inQ`,
//! `vadQ`, `sttQ`, `llmQ`, `outQ`) is backed by this single primitive
//! instead: a `parking_lot::Mutex<VecDeque<T>>` protecting push/pop/purge,
//! paired with a `tokio::sync::Notify` for async wakeups.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
    name: &'static str,
}

/// A bounded multi-producer/single-consumer queue with drop-oldest-on-full
/// backpressure and an atomic `purge()`.
pub struct BoundedQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> BoundedQueue<T> {
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                notify: Notify::new(),
                name,
            }),
        }
    }

    /// Non-blocking enqueue. If the queue is full, the oldest item is
    /// dropped and a warning logged (spec §4.1/§7c backpressure policy).
    pub fn push(&self, item: T) {
        let mut items = self.inner.items.lock();
        if items.len() >= self.inner.capacity {
            items.pop_front();
            tracing::warn!(queue = self.inner.name, "queue full, dropped oldest item");
        }
        items.push_back(item);
        drop(items);
        self.inner.notify.notify_waiters();
    }

    /// Pop the oldest item, if any, without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.items.lock().pop_front()
    }

    /// Pop the oldest item, waiting up to `timeout` for one to arrive.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        if let Some(item) = self.try_pop() {
            return Some(item);
        }
        let notified = self.inner.notify.notified();
        match tokio::time::timeout(timeout, notified).await {
            Ok(()) => self.try_pop(),
            Err(_) => None,
        }
    }

    /// Atomically clear every pending item. Used by barge-in (I4) and by
    /// `stop()` teardown.
    pub fn purge(&self) {
        let mut items = self.inner.items.lock();
        let dropped = items.len();
        items.clear();
        drop(items);
        if dropped > 0 {
            tracing::debug!(queue = self.inner.name, dropped, "queue purged");
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.lock().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_try_pop_fifo() {
        let q = BoundedQueue::new("test", 4);
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), Some(3));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let q = BoundedQueue::new("test", 2);
        q.push(1);
        q.push(2);
        q.push(3); // drops `1`
        assert_eq!(q.len(), 2);
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), Some(3));
    }

    #[test]
    fn purge_clears_atomically() {
        let q = BoundedQueue::new("test", 8);
        q.push(1);
        q.push(2);
        q.purge();
        assert!(q.is_empty());
        assert_eq!(q.try_pop(), None);
    }

    #[tokio::test]
    async fn pop_timeout_returns_none_when_empty() {
        let q: BoundedQueue<i32> = BoundedQueue::new("test", 4);
        let popped = q.pop_timeout(Duration::from_millis(10)).await;
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn pop_timeout_wakes_on_push() {
        let q: BoundedQueue<i32> = BoundedQueue::new("test", 4);
        let q2 = q.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            q2.push(42);
        });
        let popped = q.pop_timeout(Duration::from_millis(200)).await;
        assert_eq!(popped, Some(42));
    }

    #[test]
    fn clone_shares_underlying_queue() {
        let q1 = BoundedQueue::new("test", 4);
        let q2 = q1.clone();
        q1.push(1);
        assert_eq!(q2.try_pop(), Some(1));
    }
}
