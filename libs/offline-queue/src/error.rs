use thiserror::Error;

/// Errors raised while loading or persisting the queue
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;
