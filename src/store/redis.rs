//! Redis-backed store adapter.
//!
//! Each of the five transitions is a Lua script, so Redis executes it as
//! one indivisible unit against the three structures. Keys are bound via
//! KEYS[] and data via ARGV[], never interpolated into the script text.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::error::{Error, Result};
use crate::model::MessageId;

use super::{QueueKeys, QueueStore};

// KEYS: pending, values. ARGV: id, payload.
const ENQUEUE_LUA: &str = r#"
redis.call('LPUSH', KEYS[1], ARGV[1])
redis.call('HSET', KEYS[2], ARGV[1], ARGV[2])
return {ARGV[1], ARGV[2]}
"#;

// KEYS: pending, working, values. ARGV: now_ms.
// A popped id with no envelope stays claimed but yields nil; the claim is
// swept back to pending later.
const DEQUEUE_LUA: &str = r#"
local id = redis.call('RPOP', KEYS[1])
if not id then
  return nil
end
redis.call('ZADD', KEYS[2], ARGV[1], id)
if redis.call('HEXISTS', KEYS[3], id) == 1 then
  return {id, redis.call('HGET', KEYS[3], id)}
end
return nil
"#;

// KEYS: working, values. ARGV: id.
const RELEASE_LUA: &str = r#"
redis.call('ZREM', KEYS[1], ARGV[1])
redis.call('HDEL', KEYS[2], ARGV[1])
return ARGV[1]
"#;

// KEYS: working, pending. ARGV: id.
const REQUEUE_LUA: &str = r#"
redis.call('ZREM', KEYS[1], ARGV[1])
redis.call('LPUSH', KEYS[2], ARGV[1])
return ARGV[1]
"#;

// KEYS: working, pending. ARGV: now_ms, interval_ms.
const SWEEP_LUA: &str = r#"
local stale = redis.call('ZRANGEBYSCORE', KEYS[1], 0, ARGV[1] - ARGV[2])
for _, id in ipairs(stale) do
  redis.call('LPUSH', KEYS[2], id)
  redis.call('ZREM', KEYS[1], id)
end
return #stale
"#;

struct Scripts {
    enqueue: Script,
    dequeue: Script,
    release: Script,
    requeue: Script,
    sweep: Script,
}

/// Store adapter over a shared Redis instance.
///
/// `ConnectionManager` multiplexes and reconnects under the hood, so the
/// adapter is cheap to share across the engine, consumer loop, and reaper.
pub struct RedisStore {
    conn: ConnectionManager,
    keys: QueueKeys,
    scripts: Scripts,
}

impl RedisStore {
    /// Connect to Redis and prepare the transition scripts.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_keys(url, QueueKeys::default()).await
    }

    /// Connect using non-default structure names (test isolation, or
    /// several independent queues on one Redis).
    pub async fn connect_with_keys(url: &str, keys: QueueKeys) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::store("connect", e))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::store("connect", e))?;
        Ok(Self::new(conn, keys))
    }

    pub fn new(conn: ConnectionManager, keys: QueueKeys) -> Self {
        Self {
            conn,
            keys,
            scripts: Scripts {
                enqueue: Script::new(ENQUEUE_LUA),
                dequeue: Script::new(DEQUEUE_LUA),
                release: Script::new(RELEASE_LUA),
                requeue: Script::new(REQUEUE_LUA),
                sweep: Script::new(SWEEP_LUA),
            },
        }
    }
}

#[async_trait::async_trait]
impl QueueStore for RedisStore {
    async fn enqueue(&self, id: MessageId, payload: &str) -> Result<()> {
        let _echo: (String, String) = self
            .scripts
            .enqueue
            .key(&self.keys.pending)
            .key(&self.keys.values)
            .arg(id.to_string())
            .arg(payload)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| Error::store("enqueue", e))?;
        Ok(())
    }

    async fn dequeue(&self, now_ms: i64) -> Result<Option<(MessageId, String)>> {
        let hit: Option<(String, String)> = self
            .scripts
            .dequeue
            .key(&self.keys.pending)
            .key(&self.keys.working)
            .key(&self.keys.values)
            .arg(now_ms)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| Error::store("dequeue", e))?;

        match hit {
            Some((raw_id, payload)) => {
                let id = raw_id.parse::<MessageId>().map_err(|_| Error::Store {
                    op: "dequeue",
                    message: format!("store returned a non-uuid id: {raw_id:?}"),
                    source: None,
                })?;
                Ok(Some((id, payload)))
            }
            None => Ok(None),
        }
    }

    async fn release(&self, id: MessageId) -> Result<()> {
        let _echo: String = self
            .scripts
            .release
            .key(&self.keys.working)
            .key(&self.keys.values)
            .arg(id.to_string())
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| Error::store("release", e))?;
        Ok(())
    }

    async fn requeue(&self, id: MessageId) -> Result<()> {
        let _echo: String = self
            .scripts
            .requeue
            .key(&self.keys.working)
            .key(&self.keys.pending)
            .arg(id.to_string())
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| Error::store("requeue", e))?;
        Ok(())
    }

    async fn sweep(&self, now_ms: i64, interval_ms: i64) -> Result<u64> {
        let recovered: u64 = self
            .scripts
            .sweep
            .key(&self.keys.working)
            .key(&self.keys.pending)
            .arg(now_ms)
            .arg(interval_ms)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| Error::store("sweep", e))?;
        Ok(recovered)
    }

    async fn pending_size(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .llen(&self.keys.pending)
            .await
            .map_err(|e| Error::store("pending_size", e))?;
        Ok(count)
    }

    async fn working_size(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .zcard(&self.keys.working)
            .await
            .map_err(|e| Error::store("working_size", e))?;
        Ok(count)
    }

    async fn values_size(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .hlen(&self.keys.values)
            .await
            .map_err(|e| Error::store("values_size", e))?;
        Ok(count)
    }

    async fn drain(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        // One multi-key DEL so the reset is itself atomic.
        let _: () = conn
            .del(&[
                self.keys.pending.as_str(),
                self.keys.working.as_str(),
                self.keys.values.as_str(),
            ])
            .await
            .map_err(|e| Error::store("drain", e))?;
        Ok(())
    }

    fn keys(&self) -> &QueueKeys {
        &self.keys
    }
}
