use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::QueueError;
use crate::queue::Queue;

/// In-process named lists. Producers push on the left, the consumer pops on the right.
#[derive(Default)]
pub struct MemoryQueue {
    lists: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    pushed: Notify,
    closed: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&self, key: &str, payload: impl Into<Vec<u8>>) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }

        self.lock()?
            .entry(key.to_string())
            .or_default()
            .push_front(payload.into());
        self.pushed.notify_waiters();
        Ok(())
    }

    /// No more pushes. Pending messages can still be popped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.pushed.notify_waiters();
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, VecDeque<Vec<u8>>>>, QueueError> {
        self.lists
            .lock()
            .map_err(|_| QueueError::Connection("queue lock poisoned".to_string()))
    }

    fn try_pop(&self, key: &str) -> Result<Option<Vec<u8>>, QueueError> {
        Ok(self.lock()?.get_mut(key).and_then(|list| list.pop_back()))
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn pop(&self, key: &str) -> Result<Vec<u8>, QueueError> {
        loop {
            // Registered before checking, so a push in between is not missed
            let pushed = self.pushed.notified();

            if let Some(payload) = self.try_pop(key)? {
                return Ok(payload);
            }
            if self.closed.load(Ordering::Acquire) {
                return Err(QueueError::Closed);
            }

            pushed.await;
        }
    }

    async fn len(&self, key: &str) -> Result<usize, QueueError> {
        Ok(self.lock()?.get(key).map(|list| list.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_pop_in_push_order() {
        let queue = MemoryQueue::new();
        queue.push("streams", "first").unwrap();
        queue.push("streams", "second").unwrap();
        queue.push("other", "elsewhere").unwrap();

        assert_eq!(queue.len("streams").await.unwrap(), 2);
        assert_eq!(queue.pop("streams").await.unwrap(), b"first".to_vec());
        assert_eq!(queue.pop("streams").await.unwrap(), b"second".to_vec());
        assert_eq!(queue.len("streams").await.unwrap(), 0);
        assert_eq!(queue.len("other").await.unwrap(), 1);
        assert_eq!(queue.len("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(MemoryQueue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop("streams").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.push("streams", "late").unwrap();
        let payload = consumer.await.unwrap().unwrap();
        assert_eq!(payload, b"late".to_vec());
    }

    #[tokio::test]
    async fn test_close_drains_first() {
        let queue = MemoryQueue::new();
        queue.push("streams", "pending").unwrap();
        queue.close();

        assert!(matches!(queue.push("streams", "refused"), Err(QueueError::Closed)));
        assert_eq!(queue.pop("streams").await.unwrap(), b"pending".to_vec());
        assert!(matches!(queue.pop("streams").await, Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_pop() {
        let queue = Arc::new(MemoryQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop("streams").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();
        assert!(matches!(consumer.await.unwrap(), Err(QueueError::Closed)));
    }
}
