//! In-process notification bus.
//!
//! Every engine owns one `EventBus`; there is no ambient global registry.
//! Handlers are plain callbacks invoked synchronously on the task that
//! raises the notification. Lifecycle notifications use the `redisrqs:`
//! prefix; topic notifications use the raw topic string, so the two
//! namespaces cannot collide as long as topics avoid the prefix.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::MessageId;

/// Raised after a successful enqueue.
pub const ENQUEUE: &str = "redisrqs:enqueue";
/// Raised after every non-empty dequeue, alongside the topic notification.
pub const DEQUEUE: &str = "redisrqs:dequeue";
/// Raised after a successful release.
pub const RELEASE: &str = "redisrqs:release";
/// Raised after a successful requeue.
pub const REQUEUE: &str = "redisrqs:requeue";
/// Raised by the reaper after each sweep completes.
pub const SWEEP: &str = "redisrqs:sweep";
/// Raised after the administrative drain completes.
pub const DRAIN_ALL: &str = "redisrqs:drainAll";

/// What a notification carries. Shape depends on the notification name:
/// enqueue/dequeue/topic carry a delivery, release/requeue carry the id,
/// sweep/drainAll carry the completion timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Delivery { id: MessageId, message: String },
    Id(MessageId),
    Timestamp(DateTime<Utc>),
}

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Payload) + Send + Sync>;

struct Registration {
    id: SubscriptionId,
    once: bool,
    handler: Handler,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    handlers: HashMap<String, Vec<Registration>>,
}

/// Publish/subscribe registry scoped to one engine instance.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent handler for `event`.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> Result<SubscriptionId>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.register(event, false, Arc::new(handler))
    }

    /// Register a handler that fires at most once, then unregisters itself.
    pub fn subscribe_once<F>(&self, event: &str, handler: F) -> Result<SubscriptionId>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.register(event, true, Arc::new(handler))
    }

    fn register(&self, event: &str, once: bool, handler: Handler) -> Result<SubscriptionId> {
        if event.is_empty() {
            return Err(Error::Validation(
                "notification name must not be empty".to_string(),
            ));
        }
        let mut inner = self.inner.lock().expect("event bus poisoned");
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner
            .handlers
            .entry(event.to_string())
            .or_default()
            .push(Registration { id, once, handler });
        Ok(id)
    }

    /// Remove a subscription. Returns false if it was already gone
    /// (e.g. a once-handler that has fired).
    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().expect("event bus poisoned");
        match inner.handlers.get_mut(event) {
            Some(regs) => {
                let before = regs.len();
                regs.retain(|r| r.id != id);
                regs.len() < before
            }
            None => false,
        }
    }

    /// Number of live subscriptions for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        let inner = self.inner.lock().expect("event bus poisoned");
        inner.handlers.get(event).map_or(0, |regs| regs.len())
    }

    /// Deliver `payload` to every handler registered for `event`.
    ///
    /// Handlers run synchronously on the calling task, after the registry
    /// lock is released, so a handler may itself subscribe or unsubscribe.
    /// Once-handlers are consumed before delivery.
    pub fn emit(&self, event: &str, payload: &Payload) {
        let to_call: Vec<Handler> = {
            let mut inner = self.inner.lock().expect("event bus poisoned");
            match inner.handlers.get_mut(event) {
                Some(regs) => {
                    let handlers = regs.iter().map(|r| Arc::clone(&r.handler)).collect();
                    regs.retain(|r| !r.once);
                    handlers
                }
                None => Vec::new(),
            }
        };
        for handler in to_call {
            handler(payload);
        }
    }
}
