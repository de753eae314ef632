//! Run statistics and application-level accounting.

use fogmesh_core::DropReason;
use fogmesh_types::AppId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Count and sum of observed durations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Average {
    pub count: u64,
    pub total_secs: f64,
}

impl Average {
    pub fn record(&mut self, value: Duration) {
        self.count += 1;
        self.total_secs += value.as_secs_f64();
    }

    /// Mean in seconds, `None` before the first sample.
    pub fn mean_secs(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_secs / self.count as f64)
    }
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Events processed by priority.
    pub events_by_priority: [u64; 4],
    /// Total actions generated by the state machines.
    pub actions_generated: u64,
    /// Timers set.
    pub timers_set: u64,

    // ─── Messages ───
    /// Messages emitted by sensors.
    pub sensor_emissions: u64,
    /// Messages put on a link.
    pub transmissions: u64,
    /// Σ latency (s) × size (bytes) over every transmission.
    pub network_usage: f64,
    /// Messages that reached a cloud device.
    pub cloud_traffic: u64,
    /// Messages handed to a hosted instance.
    pub executions: u64,
    /// Messages that reached an actuator.
    pub actuator_deliveries: u64,
    /// Dropped messages by reason.
    pub drops: BTreeMap<DropReason, u64>,

    // ─── Timing ───
    /// End-to-end latency per (application, loop id).
    pub loop_latency: BTreeMap<(AppId, u32), Average>,
    /// Execution time per tuple type.
    pub cpu_time: BTreeMap<String, Average>,
}

impl SimulationStats {
    /// Total messages dropped.
    pub fn messages_dropped(&self) -> u64 {
        self.drops.values().sum()
    }

    pub fn drops_for(&self, reason: DropReason) -> u64 {
        self.drops.get(&reason).copied().unwrap_or(0)
    }

    /// Average loop latency in seconds.
    pub fn average_loop_latency(&self, app: &AppId, loop_id: u32) -> Option<f64> {
        self.loop_latency
            .get(&(app.clone(), loop_id))
            .and_then(Average::mean_secs)
    }

    /// Average execution time of a tuple type in seconds.
    pub fn average_cpu_time(&self, tuple_type: &str) -> Option<f64> {
        self.cpu_time.get(tuple_type).and_then(Average::mean_secs)
    }

    pub(crate) fn record_drop(&mut self, reason: DropReason) {
        *self.drops.entry(reason).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average() {
        let mut average = Average::default();
        assert_eq!(average.mean_secs(), None);
        average.record(Duration::from_secs(1));
        average.record(Duration::from_secs(3));
        assert_eq!(average.mean_secs(), Some(2.0));
    }

    #[test]
    fn test_drop_totals() {
        let mut stats = SimulationStats::default();
        stats.record_drop(DropReason::StalePin);
        stats.record_drop(DropReason::StalePin);
        stats.record_drop(DropReason::Unresolvable);
        assert_eq!(stats.messages_dropped(), 3);
        assert_eq!(stats.drops_for(DropReason::StalePin), 2);
        assert_eq!(stats.drops_for(DropReason::NoActuator), 0);
    }
}
