//! Topology setup and routing errors.

use fogmesh_types::DeviceId;

/// Errors raised while building or querying the topology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("Device {0} declared more than once")]
    DuplicateDevice(DeviceId),

    #[error("Device {device} declares unknown parent {parent}")]
    UnknownParent { device: DeviceId, parent: DeviceId },

    #[error("Parent chain of device {0} contains a cycle")]
    ParentCycle(DeviceId),

    #[error("Device {0} has a non-positive or non-finite link bandwidth")]
    InvalidBandwidth(DeviceId),

    #[error("Unknown device {0}")]
    UnknownDevice(DeviceId),

    #[error("Routing table of device {from} has no next hop for destination {to}")]
    MissingRoute { from: DeviceId, to: DeviceId },
}
