use thiserror::Error;

/// A queue message that could not be turned into metric fields.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

#[derive(Error, Debug)]
pub enum QueueError {
    /// The producer side is gone and the list has been drained.
    #[error("queue closed")]
    Closed,

    #[error("queue connection error: {0}")]
    Connection(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("report transport error: {0}")]
    Transport(String),

    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report logger error: {0}")]
    Logger(#[from] spdlog::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that stop the relay. Everything per-message is handled inside the consume loop.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("queue failure: {0}")]
    Queue(#[from] QueueError),

    #[error("publisher failure: {0}")]
    Publish(#[from] PublishError),

    #[error("publisher event stream ended")]
    PublisherGone,
}

pub type Result<T> = std::result::Result<T, RelayError>;
