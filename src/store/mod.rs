//! Store adapter: the five atomic queue transitions plus size queries.
//!
//! All shared queue state lives in three structures — a pending FIFO, a
//! working collection scored by claim time, and a values map from id to
//! serialized envelope. Every mutation goes through one of the atomic
//! operations on `QueueStore`; no other code path touches the structures.
//!
//! Two implementations: `RedisStore` (Lua scripts, the production path)
//! and `MemoryStore` (single process, used by tests and offline runs).

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::MessageId;

/// Logical names of the three queue structures. Stable: other processes
/// sharing the store address the queue through these keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    /// List of pending ids. Entries enter at the left, leave at the right.
    pub pending: String,
    /// Sorted set of claimed ids scored by claim time (ms since epoch).
    pub working: String,
    /// Hash of id → serialized envelope.
    pub values: String,
}

impl QueueKeys {
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            pending: format!("{namespace}:pending"),
            working: format!("{namespace}:working"),
            values: format!("{namespace}:values"),
        }
    }
}

impl Default for QueueKeys {
    fn default() -> Self {
        Self::with_namespace("redisrqs")
    }
}

/// One method per atomic transition. Each call is a single indivisible
/// step against the store: two concurrent dequeues, or a dequeue racing
/// a sweep, can never both claim the same id, and a failed call leaves
/// the structures as if it never started.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Push `id` onto pending and record its envelope in values.
    async fn enqueue(&self, id: MessageId, payload: &str) -> Result<()>;

    /// Claim the oldest pending id, stamping it into working at `now_ms`.
    ///
    /// Returns the id and its serialized envelope, or `None` when pending
    /// is empty. If the popped id has no envelope in values the claim is
    /// still recorded but the result is `None` — the orphaned claim sits
    /// in working until a sweep returns it.
    async fn dequeue(&self, now_ms: i64) -> Result<Option<(MessageId, String)>>;

    /// Acknowledge `id`: drop it from working and from values.
    /// Releasing an unknown id is a no-op.
    async fn release(&self, id: MessageId) -> Result<()>;

    /// Return a claimed id to the back of pending, keeping its envelope.
    async fn requeue(&self, id: MessageId) -> Result<()>;

    /// Move every claim stamped at or before `now_ms - interval_ms` back
    /// to the back of pending. Returns how many claims were recovered.
    async fn sweep(&self, now_ms: i64, interval_ms: i64) -> Result<u64>;

    async fn pending_size(&self) -> Result<u64>;
    async fn working_size(&self) -> Result<u64>;
    async fn values_size(&self) -> Result<u64>;

    /// Administrative reset: delete all three structures outright.
    async fn drain(&self) -> Result<()>;

    /// The logical structure names this store operates on.
    fn keys(&self) -> &QueueKeys;
}
