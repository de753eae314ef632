//! Placement requests and results.

use crate::{AppId, DeviceId, RequestId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Per-request mapping from microservice name to hosting device.
pub type PlacementMap = BTreeMap<RequestId, BTreeMap<String, DeviceId>>;

/// Ask to place an application's microservices for one ingress point.
///
/// `placed` starts with the client module pinned to the gateway and grows as
/// placement progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    pub id: RequestId,
    pub app_id: AppId,
    /// Client device the request originates from.
    pub gateway: DeviceId,
    pub placed: BTreeMap<String, DeviceId>,
}

impl PlacementRequest {
    pub fn new(id: RequestId, app_id: AppId, gateway: DeviceId) -> Self {
        Self {
            id,
            app_id,
            gateway,
            placed: BTreeMap::new(),
        }
    }

    /// Pin `microservice` to `device` before placement starts.
    pub fn with_placed(mut self, microservice: impl Into<String>, device: DeviceId) -> Self {
        self.placed.insert(microservice.into(), device);
        self
    }

    /// Names of the microservices already placed.
    pub fn placed_names(&self) -> BTreeSet<String> {
        self.placed.keys().cloned().collect()
    }
}

/// One placement decision, identifying which request a microservice was
/// placed for. Displayed as `request_app_microservice`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlacementSlot {
    pub request: RequestId,
    pub app_id: AppId,
    pub microservice: String,
}

impl PlacementSlot {
    pub fn new(request: RequestId, app_id: AppId, microservice: impl Into<String>) -> Self {
        Self {
            request,
            app_id,
            microservice: microservice.into(),
        }
    }
}

impl fmt::Display for PlacementSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.request, self.app_id, self.microservice)
    }
}
