//! Fogmesh Simulator
//!
//! Loads fog scenarios (devices, applications, sensors, actuators) from TOML
//! or builds the built-in demo, runs them on the deterministic simulation
//! runner and summarizes the outcome.
//!
//! # Architecture
//!
//! The simulator builds on `fogmesh-simulation` to provide:
//!
//! - **Scenario configuration**: serde/TOML description of a whole run
//! - **Demo scenario**: cloud, proxy, clustered gateways and clients
//! - **Reporting**: placements, loop latencies, traffic and drops
//!
//! # Example
//!
//! ```ignore
//! use fogmesh_simulator::{ScenarioConfig, Simulator};
//! use std::time::Duration;
//!
//! let config = ScenarioConfig::demo(2, 2);
//! let mut simulator = Simulator::new(&config, 42)?;
//! simulator.initialize();
//! let report = simulator.run_for(Duration::from_secs(60));
//! report.print_summary();
//! ```

mod config;
mod demo;
mod error;
mod report;
mod runner;

pub use config::{
    ActuatorConfig, ApplicationConfig, DeviceConfig, EdgeConfig, MicroserviceConfig,
    ScenarioConfig, SelectivityConfig, SensorConfig,
};
pub use demo::{DEMO_APP, GATEWAY_LEVEL};
pub use error::ScenarioError;
pub use report::{DevicePlacement, LoopReport, SimulationReport};
pub use runner::Simulator;
