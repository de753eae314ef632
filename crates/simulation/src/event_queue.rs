//! Event queue with deterministic ordering.

use fogmesh_core::{Event, EventPriority};
use fogmesh_types::{DeviceId, InstanceId, Message, SensorId};
use std::cmp::Ordering;
use std::time::Duration;

/// An entry of the runner's queue.
///
/// Sensors and hosted execution belong to the runner; only `Device` entries
/// are handed to a state machine.
#[derive(Debug, Clone)]
pub(crate) enum Scheduled {
    Device(Event),

    /// A sensor's emission interval elapsed.
    SensorTick { sensor: SensorId },

    /// A hosted instance finished processing a message.
    ExecutionCompleted {
        instance: InstanceId,
        message: Box<Message>,
    },
}

impl Scheduled {
    pub fn priority(&self) -> EventPriority {
        match self {
            Scheduled::Device(event) => event.priority(),
            Scheduled::SensorTick { .. } => EventPriority::Client,
            Scheduled::ExecutionCompleted { .. } => EventPriority::Internal,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scheduled::Device(event) => event.type_name(),
            Scheduled::SensorTick { .. } => "SensorTick",
            Scheduled::ExecutionCompleted { .. } => "ExecutionCompleted",
        }
    }
}

impl From<Event> for Scheduled {
    fn from(event: Event) -> Self {
        Scheduled::Device(event)
    }
}

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Priority (internal before timer before network before client)
/// 3. Device id (deterministic ordering)
/// 4. Sequence number (FIFO for same time/priority/device)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Priority for ordering at same time.
    pub priority: EventPriority,
    /// Which device receives this event.
    pub device: DeviceId,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl EventKey {
    pub(crate) fn new(time: Duration, event: &Scheduled, device: DeviceId, sequence: u64) -> Self {
        Self {
            time,
            priority: event.priority(),
            device,
            sequence,
        }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.device.cmp(&other.device))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
