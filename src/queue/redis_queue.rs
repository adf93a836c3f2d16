use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use spdlog::{debug, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::QueueError;
use crate::queue::Queue;

type PendingPop = JoinHandle<Result<Vec<u8>, QueueError>>;

/// Redis lists. Producers LPUSH, the relay BRPOPs.
///
/// Pops and length queries use separate connections, since a blocked BRPOP holds up every
/// other command on its connection.
pub struct RedisQueue {
    pop_conn: MultiplexedConnection,
    len_conn: MultiplexedConnection,
    /// BRPOP still running for a caller that went away. The next pop picks up its result.
    pending: Mutex<Option<PendingPop>>,
}

impl RedisQueue {
    pub async fn connect(host: &str, port: u16) -> Result<Self, QueueError> {
        let url = redis_url(host, port);
        let client = redis::Client::open(url.as_str())?;
        let pop_conn = client.get_multiplexed_async_connection().await?;
        let len_conn = client.get_multiplexed_async_connection().await?;
        info!("Connected to queue at {}", url);

        Ok(Self {
            pop_conn,
            len_conn,
            pending: Mutex::new(None),
        })
    }
}

fn redis_url(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("redis://[{}]:{}/", host, port)
    } else {
        format!("redis://{}:{}/", host, port)
    }
}

async fn blocking_pop(mut conn: MultiplexedConnection, key: String) -> Result<Vec<u8>, QueueError> {
    loop {
        // nil only if the server gives up on the wait
        let popped: Option<(String, Vec<u8>)> = redis::cmd("BRPOP").arg(&key).arg(0).query_async(&mut conn).await?;
        match popped {
            Some((_, payload)) => return Ok(payload),
            None => debug!("BRPOP on {} returned nothing, waiting again", key),
        }
    }
}

#[async_trait]
impl Queue for RedisQueue {
    /// The BRPOP runs on its own task. Dropping this future leaves it running and
    /// the popped message is returned by the next call.
    async fn pop(&self, key: &str) -> Result<Vec<u8>, QueueError> {
        let mut pending = self.pending.lock().await;
        let task = pending.get_or_insert_with(|| tokio::spawn(blocking_pop(self.pop_conn.clone(), key.to_string())));

        let result = task.await;
        *pending = None;
        result.map_err(|e| QueueError::Connection(format!("pop task failed: {}", e)))?
    }

    async fn len(&self, key: &str) -> Result<usize, QueueError> {
        let mut conn = self.len_conn.clone();
        let len: usize = redis::cmd("LLEN").arg(key).query_async(&mut conn).await?;
        Ok(len)
    }
}

impl Drop for RedisQueue {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.try_lock() {
            if let Some(task) = pending.take() {
                task.abort();
            }
        }
    }
}
