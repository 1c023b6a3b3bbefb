//! Notification bus behavior: registration, once semantics, removal.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use redisrqs::error::Error;
use redisrqs::events::{EventBus, Payload};
use redisrqs::model::MessageId;

fn counter_handler(counter: &Arc<AtomicUsize>) -> impl Fn(&Payload) + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn persistent_subscription_fires_on_every_emit() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    bus.subscribe("topic", counter_handler(&calls)).unwrap();

    let payload = Payload::Id(MessageId::fresh());
    bus.emit("topic", &payload);
    bus.emit("topic", &payload);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn once_subscription_fires_exactly_once() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    bus.subscribe_once("topic", counter_handler(&calls)).unwrap();

    let payload = Payload::Id(MessageId::fresh());
    bus.emit("topic", &payload);
    bus.emit("topic", &payload);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bus.subscriber_count("topic"), 0);
}

#[test]
fn unsubscribe_removes_the_handler() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let sub = bus.subscribe("topic", counter_handler(&calls)).unwrap();

    assert!(bus.unsubscribe("topic", sub));
    bus.emit("topic", &Payload::Id(MessageId::fresh()));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    // Second removal reports the subscription already gone.
    assert!(!bus.unsubscribe("topic", sub));
}

#[test]
fn emit_without_subscribers_is_harmless() {
    let bus = EventBus::new();
    bus.emit("nobody-listens", &Payload::Id(MessageId::fresh()));
}

#[test]
fn subscriptions_are_scoped_to_their_event_name() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    bus.subscribe("foo", counter_handler(&calls)).unwrap();

    bus.emit("bar", &Payload::Id(MessageId::fresh()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(bus.subscriber_count("foo"), 1);
    assert_eq!(bus.subscriber_count("bar"), 0);
}

#[test]
fn empty_event_name_is_rejected() {
    let bus = EventBus::new();
    let result = bus.subscribe("", |_| {});
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn handler_may_resubscribe_during_delivery() {
    let bus = Arc::new(EventBus::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let bus_inner = Arc::clone(&bus);
    let calls_inner = Arc::clone(&calls);
    bus.subscribe_once("topic", move |_| {
        calls_inner.fetch_add(1, Ordering::SeqCst);
        let calls_again = Arc::clone(&calls_inner);
        bus_inner
            .subscribe_once("topic", move |_| {
                calls_again.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    })
    .unwrap();

    let payload = Payload::Id(MessageId::fresh());
    bus.emit("topic", &payload);
    bus.emit("topic", &payload);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
