//! Bounded queue for server-pushed frames.
//!
//! Delivery is best-effort: when the consumer falls behind, the oldest
//! unread event is discarded to make room, so a slow consumer can never
//! stall the dispatcher or starve response delivery.

use log::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

pub(crate) const DEFAULT_QUEUE_CAPACITY: usize = 100;

pub(crate) struct NotifyQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    available: Notify,
}

impl<T> NotifyQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            available: Notify::new(),
        }
    }

    /// Enqueues an event, evicting the oldest when full. Never blocks.
    pub(crate) fn push(&self, item: T) {
        {
            let mut queue = self.inner.lock().unwrap();
            if queue.len() == self.capacity {
                queue.pop_front();
                debug!("Event queue full, oldest event dropped");
            }
            queue.push_back(item);
        }
        self.available.notify_one();
    }

    /// Waits for the next event
    pub(crate) async fn recv(&self) -> T {
        loop {
            let notified = self.available.notified();
            if let Some(item) = self.inner.lock().unwrap().pop_front() {
                return item;
            }
            notified.await;
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_recv() {
        let queue = NotifyQueue::new(4);
        queue.push(1u32);
        queue.push(2);
        assert_eq!(queue.recv().await, 1);
        assert_eq!(queue.recv().await, 2);
    }

    #[tokio::test]
    async fn test_drop_oldest_when_full() {
        let queue = NotifyQueue::new(3);
        for i in 0..5u32 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 3);
        // 0 and 1 were evicted
        assert_eq!(queue.recv().await, 2);
        assert_eq!(queue.recv().await, 3);
        assert_eq!(queue.recv().await, 4);
    }

    #[tokio::test]
    async fn test_recv_wakes_on_push() {
        let queue = std::sync::Arc::new(NotifyQueue::new(4));
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.recv().await })
        };
        tokio::task::yield_now().await;
        queue.push(7u32);
        assert_eq!(waiter.await.unwrap(), 7);
    }
}
