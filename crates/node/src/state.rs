//! Device state machine.

use crate::{
    AttachedActuator, Deployment, Dispatcher, NodeConfig, NodeError, Orchestrator,
    WeightedRoundRobin,
};
use fogmesh_core::{Action, Event, StateMachine, TimerId};
use fogmesh_placement::PlacementStrategy;
use fogmesh_topology::{Topology, TopologyError};
use fogmesh_types::{AppId, Applications, DeviceId, DeviceRole};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

/// Combined state machine of one device.
///
/// Composes the dispatch engine, the deployment ledger and, on FON and CLOUD
/// devices, the placement orchestrator of the device's domain.
pub struct DeviceStateMachine {
    device: DeviceId,
    role: DeviceRole,
    applications: Applications,
    dispatch: Dispatcher,
    deployment: Deployment,
    orchestrator: Option<Orchestrator>,
    now: Duration,
}

impl std::fmt::Debug for DeviceStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStateMachine")
            .field("device", &self.device)
            .field("role", &self.role)
            .field("instances", &self.deployment.instance_count())
            .field("orchestrator", &self.orchestrator)
            .field("now", &self.now)
            .finish()
    }
}

impl DeviceStateMachine {
    /// Create the state machine of `device`.
    ///
    /// Orchestrating roles get an orchestrator running `strategy` over their
    /// domain.
    pub fn new(
        device: DeviceId,
        topology: Arc<Topology>,
        applications: Applications,
        config: &NodeConfig,
        strategy: PlacementStrategy,
    ) -> Result<Self, TopologyError> {
        let role = topology
            .device(device)
            .map(|d| d.role)
            .ok_or(TopologyError::UnknownDevice(device))?;
        let dispatch = Dispatcher::new(device, topology.clone(), Box::new(WeightedRoundRobin::new()))
            .ok_or(TopologyError::UnknownDevice(device))?;
        let orchestrator = role.is_orchestrator().then(|| {
            Orchestrator::new(
                device,
                topology,
                applications.clone(),
                strategy.build(device),
                config.placement_interval,
            )
        });

        Ok(Self {
            device,
            role,
            applications,
            dispatch,
            deployment: Deployment::new(device),
            orchestrator,
            now: Duration::ZERO,
        })
    }

    // ─── Accessors ───

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn role(&self) -> DeviceRole {
        self.role
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn dispatch(&self) -> &Dispatcher {
        &self.dispatch
    }

    pub fn orchestrator(&self) -> Option<&Orchestrator> {
        self.orchestrator.as_ref()
    }

    // ─── Setup ───

    /// Register the client module of `app_id` on this device.
    pub fn register_client_module(&mut self, app_id: &AppId) -> Result<(), NodeError> {
        let app = self
            .applications
            .get(app_id)
            .ok_or_else(|| NodeError::UnknownApplication(app_id.clone()))?;
        self.deployment
            .register_client_module(app_id.clone(), app.client_module.clone())
    }

    pub fn attach_actuator(&mut self, actuator: AttachedActuator) {
        self.dispatch.attach_actuator(actuator);
    }

    /// Actions to run when the simulation starts.
    ///
    /// Orchestrators schedule their first placement tick at time zero;
    /// CLIENT devices deploy their registered client modules.
    pub fn initialize(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.orchestrator.is_some() {
            actions.push(Action::SetTimer {
                id: TimerId::PlacementCycle,
                duration: Duration::ZERO,
            });
        }

        let pending: Vec<(AppId, String)> = self
            .deployment
            .pending_client_modules()
            .map(|(app, module)| (app.clone(), module.to_owned()))
            .collect();
        if self.role != DeviceRole::Client {
            if !pending.is_empty() {
                warn!(
                    device = %self.device,
                    role = %self.role,
                    "Client modules registered on a non-client device are not deployed"
                );
            }
            return actions;
        }
        for (app_id, module) in pending {
            actions.push(Action::EnqueueInternal {
                event: Event::ActivateApplication {
                    app_id: app_id.clone(),
                },
            });
            actions.push(Action::EnqueueInternal {
                event: Event::ApplicationReady {
                    app_id: app_id.clone(),
                },
            });
            actions.push(Action::EnqueueInternal {
                event: Event::LaunchMicroservice {
                    app_id,
                    microservice: module,
                },
            });
        }
        actions
    }

    // ─── Handlers ───

    fn on_placement_timer(&mut self) -> Vec<Action> {
        match self.orchestrator.as_mut() {
            Some(orchestrator) => orchestrator.on_placement_timer(),
            None => {
                warn!(device = %self.device, "Placement timer on a non-orchestrating device");
                vec![]
            }
        }
    }

    fn on_placement_request(&mut self, request: fogmesh_types::PlacementRequest) -> Vec<Action> {
        match self.orchestrator.as_mut() {
            Some(orchestrator) => orchestrator.submit(request),
            None => warn!(
                device = %self.device,
                request = %request.id,
                "Placement request sent to a non-orchestrating device"
            ),
        }
        vec![]
    }

    fn on_launch(&mut self, app_id: AppId, microservice: String) -> Vec<Action> {
        if !self.applications.contains_key(&app_id) {
            warn!(device = %self.device, app = %app_id, "Launch for unknown application");
            return vec![];
        }
        if !self.deployment.is_ready(&app_id) {
            debug!(device = %self.device, app = %app_id, "Launch before application ready");
        }
        let instance = self.deployment.launch(app_id, &microservice);
        debug!(device = %self.device, %instance, microservice, "Instance launched");
        fogmesh_metrics::record_instance_launched(&microservice);
        vec![]
    }
}

impl StateMachine for DeviceStateMachine {
    #[instrument(skip(self), fields(
        device = %self.device,
        role = %self.role,
        event = %event.type_name(),
    ))]
    fn handle(&mut self, event: Event) -> Vec<Action> {
        trace!(now = ?self.now, "Handling event");
        match event {
            Event::PlacementTimer => self.on_placement_timer(),
            Event::LinkFreed { link } => self.dispatch.on_link_freed(link),
            Event::MessageArrived { message } => self.dispatch.on_message(message, &self.deployment),
            Event::PlacementRequestSubmitted { request } => self.on_placement_request(request),
            Event::ServiceDiscoveryUpdate {
                microservice,
                device,
            } => {
                self.dispatch.on_discovery_update(microservice, device);
                vec![]
            }
            Event::ActivateApplication { app_id } => {
                self.deployment.activate(app_id);
                vec![]
            }
            Event::ApplicationReady { app_id } => {
                self.deployment.mark_ready(app_id);
                vec![]
            }
            Event::LaunchMicroservice {
                app_id,
                microservice,
            } => self.on_launch(app_id, microservice),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogmesh_test_helpers::{fixtures, MessageFactory};
    use fogmesh_topology::TopologyBuilder;
    use fogmesh_types::{Direction, PlacementRequest, RequestId};

    fn machines() -> (DeviceStateMachine, DeviceStateMachine) {
        let topology = Arc::new(
            TopologyBuilder::new(fixtures::three_tier_devices(1000))
                .build()
                .unwrap(),
        );
        let apps = fixtures::applications([fixtures::single_service_app(fixtures::APP, 500)]);
        let config = NodeConfig::default();
        let fon = DeviceStateMachine::new(
            fixtures::FON,
            topology.clone(),
            apps.clone(),
            &config,
            PlacementStrategy::Edgeward,
        )
        .unwrap();
        let client = DeviceStateMachine::new(
            fixtures::CLIENT,
            topology,
            apps,
            &config,
            PlacementStrategy::Edgeward,
        )
        .unwrap();
        (fon, client)
    }

    /// Run the internal events of `actions` on `machine`.
    fn run_internal(machine: &mut DeviceStateMachine, actions: Vec<Action>) {
        for action in actions {
            if let Action::EnqueueInternal { event } = action {
                machine.handle(event);
            }
        }
    }

    #[test]
    fn test_unknown_device_rejected() {
        let topology = Arc::new(
            TopologyBuilder::new(fixtures::three_tier_devices(1000))
                .build()
                .unwrap(),
        );
        let err = DeviceStateMachine::new(
            DeviceId(77),
            topology,
            Applications::new(),
            &NodeConfig::default(),
            PlacementStrategy::Edgeward,
        )
        .unwrap_err();
        assert_eq!(err, TopologyError::UnknownDevice(DeviceId(77)));
    }

    #[test]
    fn test_orchestrator_only_on_orchestrating_roles() {
        let (fon, client) = machines();
        assert!(fon.orchestrator().is_some());
        assert!(client.orchestrator().is_none());
    }

    #[test]
    fn test_orchestrator_ticks_at_start() {
        let (mut fon, _) = machines();
        let actions = fon.initialize();
        assert!(matches!(
            actions.as_slice(),
            [Action::SetTimer {
                id: TimerId::PlacementCycle,
                duration: Duration::ZERO
            }]
        ));
    }

    #[test]
    fn test_client_module_deployed_at_start() {
        let (_, mut client) = machines();
        let app_id = AppId::new(fixtures::APP);
        client.register_client_module(&app_id).unwrap();
        assert!(client.register_client_module(&app_id).is_err());
        assert_eq!(
            client.register_client_module(&AppId::new("missing")),
            Err(NodeError::UnknownApplication(AppId::new("missing")))
        );

        let actions = client.initialize();
        assert_eq!(actions.len(), 3);
        run_internal(&mut client, actions);
        assert!(client.deployment().is_active(&app_id));
        assert!(client.deployment().hosts(&app_id, fixtures::CLIENT_MODULE));
    }

    #[test]
    fn test_request_placed_and_launched_on_fon() {
        let (mut fon, _) = machines();
        let app_id = AppId::new(fixtures::APP);
        fon.handle(Event::PlacementRequestSubmitted {
            request: PlacementRequest::new(RequestId(1), app_id.clone(), fixtures::CLIENT)
                .with_placed(fixtures::CLIENT_MODULE, fixtures::CLIENT),
        });

        let actions = fon.handle(Event::PlacementTimer);
        for action in actions {
            if let Action::Deliver { to, event } = action {
                if to == fixtures::FON {
                    fon.handle(event);
                }
            }
        }
        assert!(fon.deployment().hosts(&app_id, fixtures::SERVICE));
        assert!(fon.orchestrator().unwrap().pending().is_empty());
    }

    #[test]
    fn test_message_for_hosted_service_executes() {
        let (mut fon, _) = machines();
        let app_id = AppId::new(fixtures::APP);
        fon.handle(Event::LaunchMicroservice {
            app_id,
            microservice: fixtures::SERVICE.into(),
        });

        let app = fixtures::single_service_app(fixtures::APP, 500);
        let mut message =
            MessageFactory::new(&app).make("RAW", Direction::Up, fixtures::CLIENT_MODULE, fixtures::SERVICE);
        message.destination_device = Some(fixtures::FON);
        let actions = fon.handle(Event::MessageArrived {
            message: Box::new(message),
        });
        assert!(matches!(actions.as_slice(), [Action::Execute { .. }]));
    }
}
