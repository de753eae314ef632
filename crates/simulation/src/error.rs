//! Setup errors.

use fogmesh_node::NodeError;
use fogmesh_topology::TopologyError;
use fogmesh_types::{ActuatorId, AppId, DeviceId, SensorId};

/// Errors raised while assembling a simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("Application {0} is not registered")]
    UnknownApplication(AppId),

    #[error("Device {0} is not part of the topology")]
    UnknownDevice(DeviceId),

    #[error("No orchestrating device above gateway {0}")]
    NoOrchestrator(DeviceId),

    #[error("Application {app} has no sensor edge for tuple type {tuple_type}")]
    UnknownSensorType { app: AppId, tuple_type: String },

    #[error("Sensor {0:?} registered twice")]
    DuplicateSensor(SensorId),

    #[error("Actuator {0:?} registered twice")]
    DuplicateActuator(ActuatorId),

    #[error("Sensor {0:?} has a zero emission interval")]
    ZeroInterval(SensorId),
}
