use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::QueueError;
use crate::queue::MemoryQueue;

/// Pushes every non-empty line of `reader` onto `key`. Returns the number of lines queued.
pub async fn feed_lines<R>(reader: R, queue: &MemoryQueue, key: &str) -> Result<usize, QueueError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut total = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| QueueError::Connection(format!("Error reading input: {}", e)))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        queue.push(key, line)?;
        total += 1;
    }

    Ok(total)
}
