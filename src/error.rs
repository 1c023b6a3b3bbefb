//! Error types for redisrqs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// A store round-trip failed. `op` identifies which queue operation
    /// was in flight ("enqueue", "dequeue", ...).
    #[error("{op}: {message}")]
    Store {
        op: &'static str,
        message: String,
        #[source]
        source: Option<redis::RedisError>,
    },

    #[error("envelope codec error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a redis error with the operation it interrupted, keeping the
    /// descriptive prefixes producers and handlers see.
    pub(crate) fn store(op: &'static str, source: redis::RedisError) -> Self {
        let message = match op {
            "enqueue" => "could not queue the message".to_string(),
            "dequeue" => "unable to get the next message".to_string(),
            "release" => "unable to remove the message".to_string(),
            "requeue" => "unable to requeue the message".to_string(),
            other => format!("store operation failed ({other})"),
        };
        Error::Store {
            op,
            message,
            source: Some(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
