//! Reaper behavior against the in-process store, with a short interval
//! so abandoned claims come back within the test's lifetime.

use std::sync::Arc;
use std::time::Duration;

use redisrqs::engine::Engine;
use redisrqs::events::{self, Payload};
use redisrqs::reaper;
use redisrqs::store::MemoryStore;

#[tokio::test]
async fn reaper_returns_abandoned_claims_and_raises_sweep() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(Arc::clone(&store) as _);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    engine
        .bus()
        .subscribe(events::SWEEP, move |payload| {
            tx.send(payload.clone()).ok();
        })
        .unwrap();

    // Claim a message and never release it.
    engine.enqueue("jobs", "abandoned").await.unwrap();
    let delivery = engine.dequeue().await.unwrap().unwrap();
    assert_eq!(engine.working_size().await.unwrap(), 1);

    let mut handle = reaper::spawn(
        Arc::clone(&store) as _,
        Arc::clone(engine.bus()),
        Duration::from_millis(25),
    );

    // Wait for the claim to age out and be swept back.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if engine.pending_size().await.unwrap() == 1 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "claim was never swept back to pending"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(engine.working_size().await.unwrap(), 0);

    // Redeliverable after recovery.
    let redelivered = engine.dequeue().await.unwrap().unwrap();
    assert_eq!(redelivered.id, delivery.id);
    assert_eq!(redelivered.message, "abandoned");

    handle.shutdown();
    handle.wait().await.unwrap();

    let sweep = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("no sweep notification")
        .expect("channel closed");
    assert!(matches!(sweep, Payload::Timestamp(_)));
}

#[tokio::test]
async fn sweep_interval_is_clamped_to_the_minimum() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(Arc::clone(&store) as _);

    let mut handle = reaper::spawn(store as _, Arc::clone(engine.bus()), Duration::ZERO);
    assert_eq!(handle.interval(), Duration::from_millis(1));

    handle.shutdown();
    handle.wait().await.unwrap();
}
