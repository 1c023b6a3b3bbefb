//! # redisrqs
//!
//! Reliable at-least-once work queue coordinated through Redis.
//!
//! Producers hand named, typed messages to the [`engine::Engine`]; a
//! single [`consumer`] loop dispatches each claimed message through the
//! engine's [`events::EventBus`]; the [`reaper`] returns claims that were
//! never acknowledged to the pending queue after a configurable timeout.
//! Every state transition is one atomic scripted operation against the
//! store, so a message is never lost, never pending and claimed at once,
//! and always recoverable after a worker failure.

pub mod config;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod reaper;
pub mod store;
