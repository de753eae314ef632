//! Core types for the fogmesh device state machines.
//!
//! This crate provides the foundational types for the event-driven architecture:
//!
//! - [`Event`]: All possible inputs to a device state machine
//! - [`Action`]: All possible outputs from a device state machine
//! - [`EventPriority`]: Ordering priority for events at the same timestamp
//! - [`StateMachine`]: The trait that all state machines implement
//!
//! # Architecture
//!
//! ```text
//! Event → Runner (intercepts sensor ticks, executions) → StateMachine::handle() → Actions
//! ```
//!
//! The state machine is:
//! - **Synchronous**: No async, no .await
//! - **Deterministic**: Same state + event = same actions
//! - **Pure-ish**: Mutates self, but performs no I/O
//!
//! All I/O is handled by the runner which:
//! 1. Delivers events to the owning device
//! 2. Executes the returned actions (transmissions, timers, executions)
//! 3. Converts action results back into events

mod action;
mod event;
mod timer;
mod traits;

pub use action::{Action, DropReason};
pub use event::{Event, EventPriority};
pub use timer::TimerId;
pub use traits::StateMachine;
