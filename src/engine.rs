//! Queue engine: the public producer/handler surface.
//!
//! Assigns message identities, serializes envelopes, funnels every state
//! change through the store adapter's atomic operations, and raises
//! notifications on the engine's own bus. The engine never mutates the
//! three structures directly and never retries a failed store call.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::{self, EventBus, Payload};
use crate::model::{Delivery, Envelope, MessageId};
use crate::store::{QueueKeys, QueueStore};

pub struct Engine {
    store: Arc<dyn QueueStore>,
    bus: Arc<EventBus>,
}

impl Engine {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self {
            store,
            bus: Arc::new(EventBus::new()),
        }
    }

    /// The notification bus scoped to this engine instance.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The logical names of the three queue structures.
    pub fn queue_names(&self) -> &QueueKeys {
        self.store.keys()
    }

    /// File a message under `topic`. Returns the freshly minted id and
    /// raises `redisrqs:enqueue`.
    ///
    /// Validation happens before any store round-trip: an empty topic is
    /// rejected outright, since it could never be delivered by name.
    pub async fn enqueue(&self, topic: &str, data: &str) -> Result<MessageId> {
        if topic.is_empty() {
            return Err(Error::Validation("enqueue: topic must not be empty".into()));
        }
        let id = MessageId::fresh();
        let wire = Envelope::new(topic, data).to_wire()?;
        self.store.enqueue(id, &wire).await?;
        debug!(%id, topic, "enqueued");
        self.bus.emit(
            events::ENQUEUE,
            &Payload::Delivery {
                id,
                message: data.to_string(),
            },
        );
        Ok(id)
    }

    /// Claim the oldest pending message, if any.
    ///
    /// On a hit, raises `redisrqs:dequeue` and a second notification named
    /// after the message's topic, both carrying the same payload, then
    /// returns the delivery. An empty queue resolves to `None` with no
    /// notification.
    pub async fn dequeue(&self) -> Result<Option<Delivery>> {
        let now_ms = Utc::now().timestamp_millis();
        let Some((id, wire)) = self.store.dequeue(now_ms).await? else {
            return Ok(None);
        };
        let envelope = Envelope::from_wire(&wire)?;
        debug!(%id, topic = %envelope.topic, "dequeued");
        let payload = Payload::Delivery {
            id,
            message: envelope.data.clone(),
        };
        self.bus.emit(events::DEQUEUE, &payload);
        self.bus.emit(&envelope.topic, &payload);
        Ok(Some(Delivery {
            id,
            topic: envelope.topic,
            message: envelope.data,
        }))
    }

    /// Acknowledge a claimed message, removing it from the queue for good.
    /// Raises `redisrqs:release`. Releasing an unknown id is a no-op.
    pub async fn release(&self, id: MessageId) -> Result<MessageId> {
        self.store.release(id).await?;
        debug!(%id, "released");
        self.bus.emit(events::RELEASE, &Payload::Id(id));
        Ok(id)
    }

    /// Hand a claimed message back for redelivery. It re-enters pending at
    /// the back of the FIFO, as if newly arrived. Raises `redisrqs:requeue`.
    pub async fn requeue(&self, id: MessageId) -> Result<MessageId> {
        self.store.requeue(id).await?;
        debug!(%id, "requeued");
        self.bus.emit(events::REQUEUE, &Payload::Id(id));
        Ok(id)
    }

    pub async fn pending_size(&self) -> Result<u64> {
        self.store.pending_size().await
    }

    pub async fn working_size(&self) -> Result<u64> {
        self.store.working_size().await
    }

    pub async fn values_size(&self) -> Result<u64> {
        self.store.values_size().await
    }

    /// Administrative reset: unconditionally clear all three structures.
    /// Raises `redisrqs:drainAll` with the completion timestamp.
    pub async fn drain_all(&self) -> Result<()> {
        self.store.drain().await?;
        self.bus.emit(events::DRAIN_ALL, &Payload::Timestamp(Utc::now()));
        Ok(())
    }
}
