use async_trait::async_trait;

use crate::error::QueueError;

pub use line_feeder::feed_lines;
pub use memory_queue::MemoryQueue;
pub use redis_queue::RedisQueue;

mod line_feeder;
mod memory_queue;
mod redis_queue;

/// Blocking list queue the relay drains, keyed by list name.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Pops the oldest message of `key`, waiting as long as it takes for one to arrive.
    /// Must be cancel-safe: a dropped call never loses a message.
    async fn pop(&self, key: &str) -> Result<Vec<u8>, QueueError>;

    /// Number of messages still waiting in `key`.
    async fn len(&self, key: &str) -> Result<usize, QueueError>;
}
