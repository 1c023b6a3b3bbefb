//! Core data model.
//!
//! A message is an opaque string payload filed under a topic. The engine
//! wraps both in an envelope, stores the envelope against a generated id,
//! and hands deliveries (id + payload) to subscribers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newtype for message ids. Generated once at enqueue time, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Mint a fresh random id.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The envelope stored in the values map: topic plus opaque payload.
///
/// `data` may itself be serialized JSON, but redisrqs never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub data: String,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            data: data.into(),
        }
    }

    /// Wire format for the values map.
    pub fn to_wire(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_wire(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// A claimed message as handed to application handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: MessageId,
    /// Which topic the message was enqueued under.
    pub topic: String,
    /// The envelope's `data` field, untouched.
    pub message: String,
}
