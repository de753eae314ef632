//! Simulation configuration.

use fogmesh_node::NodeConfig;
use fogmesh_placement::PlacementStrategy;
use std::time::Duration;

/// Knobs of one simulation run. The RNG seed is passed separately.
#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub node: NodeConfig,
    pub strategy: PlacementStrategy,
}

impl SimulationConfig {
    pub fn with_placement_interval(mut self, interval: Duration) -> Self {
        self.node = self.node.with_placement_interval(interval);
        self
    }

    pub fn with_strategy(mut self, strategy: PlacementStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}
