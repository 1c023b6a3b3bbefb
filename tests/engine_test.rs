//! Integration tests for the queue engine against the in-process store.

use std::sync::{Arc, Mutex};

use redisrqs::engine::Engine;
use redisrqs::error::Error;
use redisrqs::events::{self, Payload};
use redisrqs::store::MemoryStore;

fn test_engine() -> Engine {
    Engine::new(Arc::new(MemoryStore::new()))
}

// ---------------------------------------------------------------------------
// Round trip and identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enqueue_dequeue_round_trips_topic_and_data() {
    let engine = test_engine();

    let id = engine.enqueue("orders", "order #42").await.unwrap();
    let delivery = engine.dequeue().await.unwrap().expect("should deliver");

    assert_eq!(delivery.id, id);
    assert_eq!(delivery.topic, "orders");
    assert_eq!(delivery.message, "order #42");
}

#[tokio::test]
async fn each_enqueue_mints_a_distinct_id() {
    let engine = test_engine();

    let a = engine.enqueue("t", "same").await.unwrap();
    let b = engine.enqueue("t", "same").await.unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn dequeue_on_empty_queue_resolves_none() {
    let engine = test_engine();
    assert!(engine.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn queue_names_are_the_stable_defaults() {
    let engine = test_engine();
    let keys = engine.queue_names();
    assert_eq!(keys.pending, "redisrqs:pending");
    assert_eq!(keys.working, "redisrqs:working");
    assert_eq!(keys.values, "redisrqs:values");
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dequeue_is_fifo_across_topics() {
    let engine = test_engine();

    let first = engine.enqueue("alpha", "m1").await.unwrap();
    let second = engine.enqueue("beta", "m2").await.unwrap();

    assert_eq!(engine.dequeue().await.unwrap().unwrap().id, first);
    assert_eq!(engine.dequeue().await.unwrap().unwrap().id, second);
}

#[tokio::test]
async fn requeue_moves_message_to_the_back() {
    let engine = test_engine();

    let m1 = engine.enqueue("t", "m1").await.unwrap();
    let m2 = engine.enqueue("t", "m2").await.unwrap();

    let claimed = engine.dequeue().await.unwrap().unwrap();
    assert_eq!(claimed.id, m1);
    engine.requeue(m1).await.unwrap();

    // m1 re-entered behind m2, as if newly arrived.
    assert_eq!(engine.dequeue().await.unwrap().unwrap().id, m2);
    assert_eq!(engine.dequeue().await.unwrap().unwrap().id, m1);
}

// ---------------------------------------------------------------------------
// State transitions and sizes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn claim_moves_id_from_pending_to_working() {
    let engine = test_engine();
    engine.enqueue("t", "m").await.unwrap();

    assert_eq!(engine.pending_size().await.unwrap(), 1);
    assert_eq!(engine.working_size().await.unwrap(), 0);

    engine.dequeue().await.unwrap().unwrap();

    // Never in both pending and working at once.
    assert_eq!(engine.pending_size().await.unwrap(), 0);
    assert_eq!(engine.working_size().await.unwrap(), 1);
    assert_eq!(engine.values_size().await.unwrap(), 1);
}

#[tokio::test]
async fn release_clears_working_and_values() {
    let engine = test_engine();
    engine.enqueue("t", "m").await.unwrap();
    let delivery = engine.dequeue().await.unwrap().unwrap();

    engine.release(delivery.id).await.unwrap();

    assert_eq!(engine.working_size().await.unwrap(), 0);
    assert_eq!(engine.values_size().await.unwrap(), 0);
    assert!(engine.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn releasing_an_unknown_id_is_a_noop() {
    let engine = test_engine();
    let stray = redisrqs::model::MessageId::fresh();
    assert!(engine.release(stray).await.is_ok());
}

#[tokio::test]
async fn drain_all_zeroes_every_structure_and_repeats() {
    let engine = test_engine();
    engine.enqueue("t", "m1").await.unwrap();
    engine.enqueue("t", "m2").await.unwrap();
    engine.dequeue().await.unwrap().unwrap();

    for _ in 0..2 {
        engine.drain_all().await.unwrap();
        assert_eq!(engine.pending_size().await.unwrap(), 0);
        assert_eq!(engine.working_size().await.unwrap(), 0);
        assert_eq!(engine.values_size().await.unwrap(), 0);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_topic_is_rejected_without_touching_the_store() {
    let engine = test_engine();

    let result = engine.enqueue("", "payload").await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(engine.pending_size().await.unwrap(), 0);
    assert_eq!(engine.values_size().await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dequeue_raises_generic_and_topic_notifications() {
    let engine = test_engine();
    let seen: Arc<Mutex<Vec<(String, Payload)>>> = Arc::default();

    for event in [events::DEQUEUE, "foo"] {
        let seen = Arc::clone(&seen);
        let name = event.to_string();
        engine
            .bus()
            .subscribe(event, move |payload| {
                seen.lock().unwrap().push((name.clone(), payload.clone()));
            })
            .unwrap();
    }

    let id = engine.enqueue("foo", "hello").await.unwrap();
    engine.dequeue().await.unwrap().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    for (_, payload) in seen.iter() {
        assert_eq!(
            *payload,
            Payload::Delivery {
                id,
                message: "hello".to_string()
            }
        );
    }
}

#[tokio::test]
async fn lifecycle_scenario_enqueue_deliver_release() {
    let engine = test_engine();
    let releases: Arc<Mutex<Vec<Payload>>> = Arc::default();

    {
        let releases = Arc::clone(&releases);
        engine
            .bus()
            .subscribe(events::RELEASE, move |payload| {
                releases.lock().unwrap().push(payload.clone());
            })
            .unwrap();
    }

    let id = engine.enqueue("foo", "hello").await.unwrap();
    let delivery = engine.dequeue().await.unwrap().unwrap();
    assert_eq!(delivery.message, "hello");

    engine.release(delivery.id).await.unwrap();

    assert_eq!(engine.working_size().await.unwrap(), 0);
    assert_eq!(engine.values_size().await.unwrap(), 0);
    assert_eq!(releases.lock().unwrap().as_slice(), &[Payload::Id(id)]);
}
