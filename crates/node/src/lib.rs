//! Per-device state machine for fogmesh.
//!
//! Every device of the topology runs one [`DeviceStateMachine`]. It is a
//! synchronous, deterministic machine: the runner feeds it [`Event`]s and
//! performs the [`Action`]s it returns.
//!
//! ```text
//! ┌─────────────────────── DeviceStateMachine ───────────────────────┐
//! │                                                                  │
//! │  Dispatcher ─── ServiceDirectory ─── LoadBalancer                │
//! │      │                                                           │
//! │      ├── LinkQueues (uplink / downlink / cluster)                │
//! │      └── Deployment (hosted instances, client modules)           │
//! │                                                                  │
//! │  Orchestrator (FON / CLOUD only) ─── PlacementAlgorithm          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Event`]: fogmesh_core::Event
//! [`Action`]: fogmesh_core::Action

mod config;
mod deployment;
mod discovery;
mod dispatch;
mod error;
mod link_queue;
mod load_balancer;
mod orchestrator;
mod state;

pub use config::NodeConfig;
pub use deployment::Deployment;
pub use discovery::ServiceDirectory;
pub use dispatch::{AttachedActuator, Dispatcher};
pub use error::NodeError;
pub use link_queue::LinkQueues;
pub use load_balancer::{LoadBalancer, WeightedRoundRobin};
pub use orchestrator::Orchestrator;
pub use state::DeviceStateMachine;
