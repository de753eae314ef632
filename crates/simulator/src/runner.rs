//! Scenario runner.

use crate::{ScenarioConfig, ScenarioError, SimulationReport};
use fogmesh_simulation::SimulationRunner;
use std::time::{Duration, Instant};
use tracing::info;

/// Runs one scenario on a [`SimulationRunner`].
#[derive(Debug)]
pub struct Simulator {
    runner: SimulationRunner,
    seed: u64,
}

impl Simulator {
    /// Build the topology, applications, sensors and actuators of `config`.
    pub fn new(config: &ScenarioConfig, seed: u64) -> Result<Self, ScenarioError> {
        let topology = config.topology()?;
        let applications = config.applications()?;
        let mut runner =
            SimulationRunner::new(topology, applications, config.simulation_config()?, seed)?;

        for sensor in config.sensors() {
            runner.add_sensor(sensor)?;
        }
        for actuator in config.actuators() {
            runner.add_actuator(actuator)?;
        }

        info!(
            devices = config.devices.len(),
            sensors = config.sensors.len(),
            actuators = config.actuators.len(),
            seed,
            "Simulator created"
        );

        Ok(Self { runner, seed })
    }

    /// Submit placement requests and start sensors and orchestrators.
    pub fn initialize(&mut self) {
        self.runner.initialize();
    }

    /// Advance simulated time by `duration` and report.
    pub fn run_for(&mut self, duration: Duration) -> SimulationReport {
        let end = self.runner.now() + duration;
        let started = Instant::now();
        self.runner.run_until(end);
        let wall_clock = started.elapsed();

        let stats = self.runner.stats();
        info!(
            simulated_secs = end.as_secs_f64(),
            wall_clock_ms = wall_clock.as_millis() as u64,
            events = stats.events_processed,
            actuator_deliveries = stats.actuator_deliveries,
            dropped = stats.messages_dropped(),
            "Simulation finished"
        );

        SimulationReport::collect(&self.runner, self.seed, wall_clock)
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}
