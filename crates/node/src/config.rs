//! Device configuration.

use std::time::Duration;

/// Configuration shared by every [`DeviceStateMachine`](crate::DeviceStateMachine).
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Interval between two placement cycles of an orchestrating device.
    pub placement_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            placement_interval: Duration::from_millis(1000),
        }
    }
}

impl NodeConfig {
    pub fn with_placement_interval(mut self, interval: Duration) -> Self {
        self.placement_interval = interval;
        self
    }
}
