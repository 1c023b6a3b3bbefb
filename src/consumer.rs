//! Consumption loop: drives all claims for one engine instance.
//!
//! A single owned task repeatedly calls `Engine::dequeue`. Delivery
//! fan-out rides on the engine's bus, so the loop body itself only has
//! to decide what happens on empty polls and on errors. One loop per
//! engine; processes sharing the store each run their own.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::error::{Error, Result};

/// What the loop does when a dequeue is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Treat the error as unrecoverable: the loop task resolves to `Err`
    /// and the hosting process is expected to exit. The compatible
    /// default — a broken store connection takes the consumer down.
    #[default]
    Fatal,
    /// Log, wait out the backoff, and poll again.
    Retry { backoff: Duration },
}

/// Handle to a running consumption loop.
pub struct ConsumerHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<Result<()>>,
}

impl ConsumerHandle {
    /// Ask the loop to stop after its current iteration.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Wait for the loop to finish. `Err` means a fatal dequeue failure
    /// (under `FailurePolicy::Fatal`) or a panicked task.
    pub async fn wait(&mut self) -> Result<()> {
        (&mut self.task)
            .await
            .map_err(|e| Error::Other(format!("consumer loop task failed: {e}")))?
    }
}

/// Spawn the consumption loop for `engine`.
///
/// The loop claims continuously: a delivered message immediately triggers
/// the next poll, an empty queue just loops (yielding to the scheduler so
/// an instant store cannot starve the runtime), and an error is handled
/// per `policy`.
pub fn spawn(engine: Arc<Engine>, policy: FailurePolicy) -> ConsumerHandle {
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(run(engine, policy, Arc::clone(&shutdown)));
    ConsumerHandle { shutdown, task }
}

async fn run(engine: Arc<Engine>, policy: FailurePolicy, shutdown: Arc<Notify>) -> Result<()> {
    info!("consumer loop started");
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("consumer loop shutting down");
                return Ok(());
            }
            result = engine.dequeue() => match result {
                Ok(Some(delivery)) => {
                    debug!(id = %delivery.id, topic = %delivery.topic, "delivered");
                }
                Ok(None) => {
                    tokio::task::yield_now().await;
                }
                Err(e) => match policy {
                    FailurePolicy::Fatal => {
                        error!("consumer loop fatal: {e}");
                        return Err(e);
                    }
                    FailurePolicy::Retry { backoff } => {
                        warn!("dequeue failed: {e}, retrying in {backoff:?}");
                        tokio::time::sleep(backoff).await;
                    }
                },
            },
        }
    }
}
