//! In-process store adapter.
//!
//! Models the same three structures and the same transition contract as
//! the Redis adapter, behind one mutex so every operation is atomic.
//! Used by the test suite and for offline development; state vanishes
//! with the process.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::Result;
use crate::model::MessageId;

use super::{QueueKeys, QueueStore};

#[derive(Default)]
struct Structures {
    /// FIFO of pending ids: enqueue pushes the back, dequeue pops the front.
    pending: VecDeque<MessageId>,
    /// Claimed id → claim timestamp (ms since epoch).
    working: HashMap<MessageId, i64>,
    /// id → serialized envelope.
    values: HashMap<MessageId, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Structures>,
    keys: QueueKeys,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl QueueStore for MemoryStore {
    async fn enqueue(&self, id: MessageId, payload: &str) -> Result<()> {
        let mut state = self.state.lock().expect("memory store poisoned");
        state.pending.push_back(id);
        state.values.insert(id, payload.to_string());
        Ok(())
    }

    async fn dequeue(&self, now_ms: i64) -> Result<Option<(MessageId, String)>> {
        let mut state = self.state.lock().expect("memory store poisoned");
        let Some(id) = state.pending.pop_front() else {
            return Ok(None);
        };
        state.working.insert(id, now_ms);
        // Missing envelope: the claim stands, the result is empty.
        Ok(state.values.get(&id).map(|payload| (id, payload.clone())))
    }

    async fn release(&self, id: MessageId) -> Result<()> {
        let mut state = self.state.lock().expect("memory store poisoned");
        state.working.remove(&id);
        state.values.remove(&id);
        Ok(())
    }

    async fn requeue(&self, id: MessageId) -> Result<()> {
        let mut state = self.state.lock().expect("memory store poisoned");
        state.working.remove(&id);
        state.pending.push_back(id);
        Ok(())
    }

    async fn sweep(&self, now_ms: i64, interval_ms: i64) -> Result<u64> {
        let mut state = self.state.lock().expect("memory store poisoned");
        let cutoff = now_ms - interval_ms;
        let mut stale: Vec<(MessageId, i64)> = state
            .working
            .iter()
            .filter(|&(_, &claimed_at)| claimed_at <= cutoff)
            .map(|(&id, &claimed_at)| (id, claimed_at))
            .collect();
        // Oldest claims re-enter pending first, matching the zset scan order.
        stale.sort_by_key(|&(_, claimed_at)| claimed_at);
        for &(id, _) in &stale {
            state.working.remove(&id);
            state.pending.push_back(id);
        }
        Ok(stale.len() as u64)
    }

    async fn pending_size(&self) -> Result<u64> {
        let state = self.state.lock().expect("memory store poisoned");
        Ok(state.pending.len() as u64)
    }

    async fn working_size(&self) -> Result<u64> {
        let state = self.state.lock().expect("memory store poisoned");
        Ok(state.working.len() as u64)
    }

    async fn values_size(&self) -> Result<u64> {
        let state = self.state.lock().expect("memory store poisoned");
        Ok(state.values.len() as u64)
    }

    async fn drain(&self) -> Result<()> {
        let mut state = self.state.lock().expect("memory store poisoned");
        state.pending.clear();
        state.working.clear();
        state.values.clear();
        Ok(())
    }

    fn keys(&self) -> &QueueKeys {
        &self.keys
    }
}
