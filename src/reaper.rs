//! Reaper: returns abandoned claims to the pending queue.
//!
//! A periodic task that runs the store's sweep on every tick. The tick
//! period doubles as the staleness threshold: any claim older than one
//! interval at sweep time is considered abandoned, regardless of which
//! consumer claimed it or why it was never acknowledged.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::clamp_sweep_interval;
use crate::error::{Error, Result};
use crate::events::{self, EventBus, Payload};
use crate::store::QueueStore;

/// Handle to a running reaper.
pub struct ReaperHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
    interval: Duration,
}

impl ReaperHandle {
    /// The effective (clamped) sweep interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    pub async fn wait(&mut self) -> Result<()> {
        (&mut self.task)
            .await
            .map_err(|e| Error::Other(format!("reaper task failed: {e}")))
    }
}

/// Spawn the reaper. Raises `redisrqs:sweep` on the bus after each
/// completed sweep, carrying the completion timestamp.
pub fn spawn(store: Arc<dyn QueueStore>, bus: Arc<EventBus>, interval: Duration) -> ReaperHandle {
    let interval = clamp_sweep_interval(interval);
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(run(store, bus, interval, Arc::clone(&shutdown)));
    ReaperHandle {
        shutdown,
        task,
        interval,
    }
}

async fn run(
    store: Arc<dyn QueueStore>,
    bus: Arc<EventBus>,
    interval: Duration,
    shutdown: Arc<Notify>,
) {
    info!(interval_ms = interval.as_millis() as u64, "reaper started");
    let mut ticker = tokio::time::interval(interval);
    // One sweep in flight at a time; a slow sweep delays the next tick
    // instead of letting ticks pile up.
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // interval() fires immediately the first time; a sweep at t=0 has
    // nothing stale yet, so skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("reaper shutting down");
                return;
            }
            _ = ticker.tick() => {
                let now_ms = Utc::now().timestamp_millis();
                match store.sweep(now_ms, interval.as_millis() as i64).await {
                    Ok(recovered) => {
                        if recovered > 0 {
                            info!(recovered, "sweep returned abandoned claims to pending");
                        } else {
                            debug!("sweep found no stale claims");
                        }
                        bus.emit(events::SWEEP, &Payload::Timestamp(Utc::now()));
                    }
                    // The next tick gets another chance; the claims stay put.
                    Err(e) => warn!("sweep failed: {e}"),
                }
            }
        }
    }
}
