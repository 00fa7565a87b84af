//! Generic bounded queue with drop-oldest-on-overflow semantics and an
//! overflow counter.
//!
//! `tokio::sync::mpsc` only supports reject-newest backpressure via
//! `try_send`; the concurrency model calls for drop-oldest everywhere a
//! slow consumer shouldn't stall its producer, so this small ring buffer
//! (mutex + `Notify`) is the shared primitive for the PCM channel, the
//! window channel, and per-sink detection queues.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, Notify};

/// A bounded, single-consumer-oriented queue. Multiple producers may push
/// concurrently; `pop` is safe to call from multiple consumers but is
/// intended for one drain task per queue.
pub struct BoundedDropQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl<T> BoundedDropQueue<T> {
    /// Construct an empty queue holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push `item`, dropping the oldest queued item and incrementing the
    /// overflow counter if the queue is already at capacity.
    pub async fn push(&self, item: T) {
        let mut items = self.items.lock().await;
        if items.len() >= self.capacity {
            items.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        items.push_back(item);
        drop(items);
        self.notify.notify_one();
    }

    /// Wait for and remove the oldest item.
    pub async fn pop(&self) -> T {
        loop {
            {
                let mut items = self.items.lock().await;
                if let Some(item) = items.pop_front() {
                    return item;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Total number of items dropped due to overflow since construction.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_beyond_capacity_drops_oldest_and_counts() {
        let queue = BoundedDropQueue::new(2);
        for i in 0..5 {
            queue.push(i).await;
        }
        assert_eq!(queue.dropped_count(), 3);
        assert_eq!(queue.pop().await, 3);
        assert_eq!(queue.pop().await, 4);
    }

    #[tokio::test]
    async fn pop_waits_for_a_push() {
        let queue = std::sync::Arc::new(BoundedDropQueue::new(4));
        let consumer = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::task::yield_now().await;
        queue.push(42).await;
        assert_eq!(consumer.await.unwrap(), 42);
    }
}
