//! Deterministic simulation runner.
//!
//! This crate drives a fogmesh topology through simulated time. Given the
//! same seed, it produces identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Event Queue (BTreeMap<EventKey, Scheduled>)      │ │
//! │  │     Ordered by: time, priority, device, sequence   │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │            SensorTick /   │   everything else           │
//! │       ExecutionCompleted  ▼                             │
//! │  ┌──────────────┐   ┌─────────────────────────────────┐ │
//! │  │ runner-owned │   │ devices: DeviceStateMachine     │ │
//! │  │ sensors,     │   │ one per topology device         │ │
//! │  │ execution    │   └───────────────┬─────────────────┘ │
//! │  └──────┬───────┘                   │                   │
//! │         ▼                           ▼                   │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → schedule new events, accounting      │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod config;
mod endpoints;
mod error;
mod event_queue;
mod runner;
mod stats;

pub use config::SimulationConfig;
pub use endpoints::{ActuatorSpec, SensorSpec};
pub use error::SetupError;
pub use runner::SimulationRunner;
pub use stats::{Average, SimulationStats};
