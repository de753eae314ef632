//! Applications and microservice instances hosted on one device.

use crate::NodeError;
use fogmesh_core::DropReason;
use fogmesh_types::{AppId, DeviceId, InstanceId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Per-device deployment ledger.
///
/// Instances are keyed by (application, microservice) so two applications
/// may use the same microservice name without sharing instances.
#[derive(Debug, Clone)]
pub struct Deployment {
    device: DeviceId,
    active: BTreeSet<AppId>,
    ready: BTreeSet<AppId>,
    instances: BTreeMap<(AppId, String), Vec<InstanceId>>,
    next_local: u32,
    /// Client modules registered on this device and not yet launched.
    client_modules: BTreeMap<AppId, String>,
    launched_clients: BTreeSet<AppId>,
}

impl Deployment {
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            active: BTreeSet::new(),
            ready: BTreeSet::new(),
            instances: BTreeMap::new(),
            next_local: 0,
            client_modules: BTreeMap::new(),
            launched_clients: BTreeSet::new(),
        }
    }

    /// Register the client module of `app_id`, to be launched at start.
    ///
    /// A device deploys at most one client module per application.
    pub fn register_client_module(
        &mut self,
        app_id: AppId,
        module: impl Into<String>,
    ) -> Result<(), NodeError> {
        if self.client_modules.contains_key(&app_id) || self.launched_clients.contains(&app_id) {
            return Err(NodeError::DuplicateClientModule {
                device: self.device,
                app: app_id,
            });
        }
        self.client_modules.insert(app_id, module.into());
        Ok(())
    }

    /// Client modules still waiting for their launch.
    pub fn pending_client_modules(&self) -> impl Iterator<Item = (&AppId, &str)> {
        self.client_modules
            .iter()
            .map(|(app, module)| (app, module.as_str()))
    }

    pub fn activate(&mut self, app_id: AppId) {
        self.active.insert(app_id);
    }

    pub fn mark_ready(&mut self, app_id: AppId) {
        if !self.active.contains(&app_id) {
            debug!(device = %self.device, app = %app_id, "Application ready before activation");
        }
        self.ready.insert(app_id);
    }

    pub fn is_active(&self, app_id: &AppId) -> bool {
        self.active.contains(app_id)
    }

    pub fn is_ready(&self, app_id: &AppId) -> bool {
        self.ready.contains(app_id)
    }

    /// Launch a new instance and return its id.
    pub fn launch(&mut self, app_id: AppId, microservice: &str) -> InstanceId {
        let instance = InstanceId::new(self.device, self.next_local);
        self.next_local += 1;

        if self.client_modules.get(&app_id).map(String::as_str) == Some(microservice) {
            self.client_modules.remove(&app_id);
            self.launched_clients.insert(app_id.clone());
        }

        self.instances
            .entry((app_id, microservice.to_owned()))
            .or_default()
            .push(instance);
        instance
    }

    /// Instances of `microservice` in launch order.
    pub fn instances_of(&self, app_id: &AppId, microservice: &str) -> &[InstanceId] {
        self.instances
            .get(&(app_id.clone(), microservice.to_owned()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn hosts(&self, app_id: &AppId, microservice: &str) -> bool {
        !self.instances_of(app_id, microservice).is_empty()
    }

    /// Total number of hosted instances.
    pub fn instance_count(&self) -> usize {
        self.instances.values().map(Vec::len).sum()
    }

    /// Hosted microservices as (application, microservice, instance count).
    pub fn placements(&self) -> impl Iterator<Item = (&AppId, &str, usize)> {
        self.instances
            .iter()
            .map(|((app, microservice), ids)| (app, microservice.as_str(), ids.len()))
    }

    /// Choose the instance that processes a message for `microservice`.
    ///
    /// A pinned message must go to its pinned instance; an unpinned message
    /// goes to the first instance launched.
    pub fn select_instance(
        &self,
        app_id: &AppId,
        microservice: &str,
        pin: Option<InstanceId>,
    ) -> Result<InstanceId, DropReason> {
        let instances = self.instances_of(app_id, microservice);
        match pin {
            Some(pinned) if instances.contains(&pinned) => Ok(pinned),
            Some(_) => Err(DropReason::StalePin),
            None => instances.first().copied().ok_or(DropReason::NoInstance),
        }
    }
}
