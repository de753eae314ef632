//! Device registration errors.

use fogmesh_types::{AppId, DeviceId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("Device {device} already deploys a client module for application {app}")]
    DuplicateClientModule { device: DeviceId, app: AppId },

    #[error("Application {0} is not registered")]
    UnknownApplication(AppId),
}
