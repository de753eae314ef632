//! Action types returned by the device state machines.

use crate::{Event, TimerId};
use fogmesh_types::{ActuatorId, DeviceId, InstanceId, LinkKind, Message, MessageId};
use std::fmt;
use std::time::Duration;

/// Why a message left the system without being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DropReason {
    /// No device could be resolved for the destination microservice.
    Unresolvable,
    /// The destination is this device but no instance of the microservice is hosted.
    NoInstance,
    /// The message is pinned to an instance this device does not host.
    StalePin,
    /// The routing table has no next hop for the destination.
    MissingRoute,
    /// The next hop is not the parent, a child or a cluster sibling.
    NotAdjacent,
    /// An actuator message arrived at a device without matching actuators.
    NoActuator,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::Unresolvable => "unresolvable",
            DropReason::NoInstance => "no_instance",
            DropReason::StalePin => "stale_pin",
            DropReason::MissingRoute => "missing_route",
            DropReason::NotAdjacent => "not_adjacent",
            DropReason::NoActuator => "no_actuator",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions the state machine wants the runner to perform.
///
/// Actions are **commands** - they describe something to do.
#[derive(Debug, Clone)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Network
    // ═══════════════════════════════════════════════════════════════════════
    /// Put `message` on the wire towards the adjacent device `to`.
    ///
    /// The message arrives after `transmission + latency`. The sending
    /// device keeps the link busy for `transmission` on its own.
    Transmit {
        to: DeviceId,
        link: LinkKind,
        message: Box<Message>,
        /// Serialization delay (size / bandwidth).
        transmission: Duration,
        /// Propagation latency of the link.
        latency: Duration,
    },

    /// Deliver a control-plane event to another device with zero delay.
    Deliver { to: DeviceId, event: Event },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers & internal
    // ═══════════════════════════════════════════════════════════════════════
    /// Fire `id` after `duration`.
    SetTimer { id: TimerId, duration: Duration },

    /// Process `event` on this device at the current time.
    EnqueueInternal { event: Event },

    // ═══════════════════════════════════════════════════════════════════════
    // Execution & delivery
    // ═══════════════════════════════════════════════════════════════════════
    /// Hand `message` to a hosted instance for processing.
    Execute {
        instance: InstanceId,
        message: Box<Message>,
    },

    /// Hand `message` to an actuator attached to this device.
    DeliverToActuator {
        actuator: ActuatorId,
        message: Box<Message>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Accounting
    // ═══════════════════════════════════════════════════════════════════════
    /// A message was dropped.
    RecordDrop {
        message: MessageId,
        reason: DropReason,
    },

    /// A message arrived at a cloud device.
    RecordCloudTraffic { message: MessageId },
}

impl Action {
    /// Get the action type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Transmit { .. } => "Transmit",
            Action::Deliver { .. } => "Deliver",
            Action::SetTimer { .. } => "SetTimer",
            Action::EnqueueInternal { .. } => "EnqueueInternal",
            Action::Execute { .. } => "Execute",
            Action::DeliverToActuator { .. } => "DeliverToActuator",
            Action::RecordDrop { .. } => "RecordDrop",
            Action::RecordCloudTraffic { .. } => "RecordCloudTraffic",
        }
    }
}
