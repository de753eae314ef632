//! Placement errors.

use fogmesh_types::DeviceId;

/// A shift-upstream attempt found no device able to absorb the load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not shift {microservices:?} upstream from device {from}: reached {reached} at the top of the domain")]
pub struct ShiftError {
    /// Device that ran out of capacity.
    pub from: DeviceId,
    /// Last device tried.
    pub reached: DeviceId,
    /// Microservices that would have moved.
    pub microservices: Vec<String>,
}
