//! Per-device message dispatch.
//!
//! Every arriving message goes through the same decision chain:
//!
//! ```text
//! ACTUATOR? ──yes──► attached actuators
//!    │
//! unresolved? ──yes──► UP: load balancer / DOWN: traversal ledger
//!    │
//! destination == self? ──yes──► hosted instance (pin aware)
//!    │
//! next hop ──► uplink / downlink / cluster queue
//! ```

use crate::{Deployment, LinkQueues, LoadBalancer, ServiceDirectory};
use fogmesh_core::{Action, DropReason};
use fogmesh_topology::Topology;
use fogmesh_types::{ActuatorId, AppId, DeviceId, DeviceRole, Direction, LinkKind, Message};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// An actuator attached to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedActuator {
    pub id: ActuatorId,
    pub app_id: AppId,
    pub actuator_type: String,
}

/// Resolves, routes and delivers messages for one device.
pub struct Dispatcher {
    device: DeviceId,
    role: DeviceRole,
    topology: Arc<Topology>,
    directory: ServiceDirectory,
    balancer: Box<dyn LoadBalancer>,
    links: LinkQueues,
    actuators: Vec<AttachedActuator>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("device", &self.device)
            .field("role", &self.role)
            .field("directory", &self.directory)
            .field("links", &self.links)
            .field("actuators", &self.actuators)
            .finish()
    }
}

impl Dispatcher {
    /// Create the dispatcher of `device`, which must belong to `topology`.
    pub fn new(
        device: DeviceId,
        topology: Arc<Topology>,
        balancer: Box<dyn LoadBalancer>,
    ) -> Option<Self> {
        let spec = topology.device(device)?;
        let role = spec.role;
        let links = LinkQueues::new(
            spec.bandwidth(LinkKind::Uplink),
            spec.bandwidth(LinkKind::Downlink),
            spec.bandwidth(LinkKind::Cluster),
        );
        Some(Self {
            device,
            role,
            topology,
            directory: ServiceDirectory::new(),
            balancer,
            links,
            actuators: Vec::new(),
        })
    }

    pub fn directory(&self) -> &ServiceDirectory {
        &self.directory
    }

    pub fn links(&self) -> &LinkQueues {
        &self.links
    }

    pub fn attach_actuator(&mut self, actuator: AttachedActuator) {
        self.actuators.push(actuator);
    }

    pub fn on_discovery_update(&mut self, microservice: String, device: DeviceId) {
        debug!(at = %self.device, microservice, host = %device, "Service discovered");
        self.directory.add(microservice, device);
        fogmesh_metrics::record_discovery_update();
    }

    pub fn on_link_freed(&mut self, link: LinkKind) -> Vec<Action> {
        self.links.on_link_freed(link)
    }

    /// Handle a message arriving at this device.
    pub fn on_message(&mut self, mut message: Box<Message>, deployment: &Deployment) -> Vec<Action> {
        trace!(
            device = %self.device,
            message = %message.id,
            tuple_type = %message.tuple_type,
            dest = %message.dest_module,
            "Message arrived"
        );

        if message.direction == Direction::Actuator {
            return self.deliver_to_actuators(message);
        }

        let mut actions = Vec::new();
        if self.role == DeviceRole::Cloud {
            fogmesh_metrics::record_cloud_traffic();
            actions.push(Action::RecordCloudTraffic {
                message: message.id,
            });
        }

        let destination = match message.destination_device {
            Some(destination) => destination,
            None => match self.resolve(&message) {
                Some(destination) => {
                    message.destination_device = Some(destination);
                    message.source_device = Some(self.device);
                    destination
                }
                None => {
                    warn!(
                        device = %self.device,
                        message = %message.id,
                        microservice = %message.dest_module,
                        direction = ?message.direction,
                        "No device resolvable for destination microservice"
                    );
                    actions.push(dropped(&message, DropReason::Unresolvable));
                    return actions;
                }
            },
        };

        if destination == self.device {
            actions.push(self.execute_locally(message, deployment));
        } else {
            actions.extend(self.forward(message, destination));
        }
        actions
    }

    fn resolve(&mut self, message: &Message) -> Option<DeviceId> {
        match message.direction {
            Direction::Up => self.balancer.select(&message.dest_module, &self.directory),
            Direction::Down => message.device_for_microservice(&message.dest_module),
            Direction::Actuator => None,
        }
    }

    fn execute_locally(&self, mut message: Box<Message>, deployment: &Deployment) -> Action {
        let pin = message.pin(&message.dest_module);
        match deployment.select_instance(&message.app_id, &message.dest_module, pin) {
            Ok(instance) => {
                let microservice = message.dest_module.clone();
                message.set_pin(microservice.clone(), instance);
                message.record_traversal(self.device, microservice);
                Action::Execute { instance, message }
            }
            Err(reason) => {
                debug!(
                    device = %self.device,
                    message = %message.id,
                    microservice = %message.dest_module,
                    ?pin,
                    %reason,
                    "No matching instance, dropping message"
                );
                dropped(&message, reason)
            }
        }
    }

    fn forward(&mut self, message: Box<Message>, destination: DeviceId) -> Vec<Action> {
        let next = match self.topology.next_hop(self.device, destination) {
            Ok(next) => next,
            Err(e) => {
                error!(device = %self.device, error = %e, "Routing error");
                return vec![dropped(&message, DropReason::MissingRoute)];
            }
        };
        let Some(link) = self.topology.link(self.device, next) else {
            error!(
                device = %self.device,
                next_hop = %next,
                destination = %destination,
                "Next hop is not adjacent"
            );
            return vec![dropped(&message, DropReason::NotAdjacent)];
        };
        debug!(
            device = %self.device,
            message = %message.id,
            next_hop = %next,
            link = ?link.kind,
            "Forwarding"
        );
        self.links.send(link.kind, next, link.latency, message)
    }

    fn deliver_to_actuators(&self, message: Box<Message>) -> Vec<Action> {
        let targets: Vec<ActuatorId> = self
            .actuators
            .iter()
            .filter(|a| match message.actuator {
                Some(id) => a.id == id,
                None => a.app_id == message.app_id && a.actuator_type == message.dest_module,
            })
            .map(|a| a.id)
            .collect();

        if targets.is_empty() {
            debug!(device = %self.device, message = %message.id, "No actuator for message");
            return vec![dropped(&message, DropReason::NoActuator)];
        }
        targets
            .into_iter()
            .map(|actuator| Action::DeliverToActuator {
                actuator,
                message: message.clone(),
            })
            .collect()
    }
}

fn dropped(message: &Message, reason: DropReason) -> Action {
    fogmesh_metrics::record_message_dropped(reason.as_str());
    Action::RecordDrop {
        message: message.id,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeightedRoundRobin;
    use fogmesh_test_helpers::{fixtures, MessageFactory};
    use fogmesh_topology::TopologyBuilder;
    use fogmesh_types::{Application, InstanceId};
    use std::time::Duration;
    use tracing_test::traced_test;

    fn dispatcher(device: DeviceId, topology: &Arc<Topology>) -> Dispatcher {
        Dispatcher::new(device, topology.clone(), Box::new(WeightedRoundRobin::new())).unwrap()
    }

    fn three_tier() -> Arc<Topology> {
        Arc::new(
            TopologyBuilder::new(fixtures::two_client_devices(1000))
                .build()
                .unwrap(),
        )
    }

    fn clustered() -> Arc<Topology> {
        Arc::new(
            TopologyBuilder::new(fixtures::clustered_devices(2, 1))
                .with_cluster_level(fixtures::GATEWAY_LEVEL)
                .with_cluster_latency(Duration::from_millis(2))
                .build()
                .unwrap(),
        )
    }

    fn app() -> Application {
        fixtures::single_service_app(fixtures::APP, 500)
    }

    fn transmit_target(actions: &[Action]) -> Option<(DeviceId, LinkKind, Option<DeviceId>)> {
        actions.iter().find_map(|a| match a {
            Action::Transmit {
                to, link, message, ..
            } => Some((*to, *link, message.destination_device)),
            _ => None,
        })
    }

    #[test]
    fn test_up_message_resolved_through_load_balancer() {
        let topology = three_tier();
        let mut client = dispatcher(fixtures::CLIENT, &topology);
        client.on_discovery_update(fixtures::SERVICE.into(), fixtures::FON);

        let message = MessageFactory::new(&app()).make(
            "RAW",
            Direction::Up,
            fixtures::CLIENT_MODULE,
            fixtures::SERVICE,
        );
        let actions = client.on_message(Box::new(message), &Deployment::new(fixtures::CLIENT));
        assert_eq!(
            transmit_target(&actions),
            Some((fixtures::FON, LinkKind::Uplink, Some(fixtures::FON)))
        );
    }

    #[test]
    fn test_round_robin_alternates_hosts() {
        let topology = three_tier();
        let mut client = dispatcher(fixtures::CLIENT, &topology);
        client.on_discovery_update(fixtures::SERVICE.into(), fixtures::FON);
        client.on_discovery_update(fixtures::SERVICE.into(), fixtures::CLOUD);

        let mut factory = MessageFactory::new(&app());
        let deployment = Deployment::new(fixtures::CLIENT);
        let destinations: Vec<_> = (0..3)
            .map(|_| {
                let message =
                    factory.make("RAW", Direction::Up, fixtures::CLIENT_MODULE, fixtures::SERVICE);
                let actions = client.on_message(Box::new(message), &deployment);
                // Free the uplink so every message is transmitted immediately.
                client.on_link_freed(LinkKind::Uplink);
                transmit_target(&actions).and_then(|t| t.2)
            })
            .collect();
        assert_eq!(
            destinations,
            vec![Some(fixtures::FON), Some(fixtures::CLOUD), Some(fixtures::FON)]
        );
    }

    #[traced_test]
    #[test]
    fn test_unresolvable_up_message_dropped() {
        let topology = three_tier();
        let mut client = dispatcher(fixtures::CLIENT, &topology);
        let message = MessageFactory::new(&app()).make(
            "RAW",
            Direction::Up,
            fixtures::CLIENT_MODULE,
            fixtures::SERVICE,
        );
        let actions = client.on_message(Box::new(message), &Deployment::new(fixtures::CLIENT));
        assert!(matches!(
            actions.as_slice(),
            [Action::RecordDrop {
                reason: DropReason::Unresolvable,
                ..
            }]
        ));
        assert!(logs_contain("No device resolvable"));
    }

    #[test]
    fn test_down_message_follows_traversal_ledger() {
        let topology = three_tier();
        let mut fon = dispatcher(fixtures::FON, &topology);
        let mut message = MessageFactory::new(&app()).make(
            "SERVICE_OUT",
            Direction::Down,
            fixtures::SERVICE,
            fixtures::CLIENT_MODULE,
        );
        message.record_traversal(fixtures::CLIENT_B, fixtures::CLIENT_MODULE);

        let actions = fon.on_message(Box::new(message), &Deployment::new(fixtures::FON));
        assert_eq!(
            transmit_target(&actions),
            Some((fixtures::CLIENT_B, LinkKind::Downlink, Some(fixtures::CLIENT_B)))
        );
    }

    #[test]
    fn test_local_execution_pins_and_records_traversal() {
        let topology = three_tier();
        let mut fon = dispatcher(fixtures::FON, &topology);
        let mut deployment = Deployment::new(fixtures::FON);
        let instance = deployment.launch(AppId::new(fixtures::APP), fixtures::SERVICE);

        let mut message = MessageFactory::new(&app()).make(
            "RAW",
            Direction::Up,
            fixtures::CLIENT_MODULE,
            fixtures::SERVICE,
        );
        message.destination_device = Some(fixtures::FON);

        let actions = fon.on_message(Box::new(message), &deployment);
        match actions.as_slice() {
            [Action::Execute {
                instance: chosen,
                message,
            }] => {
                assert_eq!(*chosen, instance);
                assert_eq!(message.pin(fixtures::SERVICE), Some(instance));
                assert_eq!(
                    message.device_for_microservice(fixtures::SERVICE),
                    Some(fixtures::FON)
                );
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[traced_test]
    #[test]
    fn test_stale_pin_dropped_without_ledger_change() {
        let topology = three_tier();
        let mut fon = dispatcher(fixtures::FON, &topology);
        let mut deployment = Deployment::new(fixtures::FON);
        deployment.launch(AppId::new(fixtures::APP), fixtures::SERVICE);

        let mut message = MessageFactory::new(&app()).make(
            "RAW",
            Direction::Up,
            fixtures::CLIENT_MODULE,
            fixtures::SERVICE,
        );
        message.destination_device = Some(fixtures::FON);
        message.set_pin(fixtures::SERVICE, InstanceId::new(fixtures::CLOUD, 7));

        let actions = fon.on_message(Box::new(message), &deployment);
        assert!(matches!(
            actions.as_slice(),
            [Action::RecordDrop {
                reason: DropReason::StalePin,
                ..
            }]
        ));
        assert!(!actions.iter().any(|a| matches!(a, Action::Execute { .. })));
        assert!(logs_contain("No matching instance"));
    }

    #[test]
    fn test_sibling_reached_over_cluster_link() {
        let topology = clustered();
        let gateways = fixtures::gateway_ids(2);
        let mut gw = dispatcher(gateways[0], &topology);
        gw.on_discovery_update(fixtures::SERVICE.into(), gateways[1]);

        let message = MessageFactory::new(&app()).make(
            "RAW",
            Direction::Up,
            fixtures::CLIENT_MODULE,
            fixtures::SERVICE,
        );
        let actions = gw.on_message(Box::new(message), &Deployment::new(gateways[0]));
        assert_eq!(
            transmit_target(&actions),
            Some((gateways[1], LinkKind::Cluster, Some(gateways[1])))
        );
        assert!(gw.links().is_busy(LinkKind::Cluster));
    }

    #[test]
    fn test_cloud_records_inbound_traffic() {
        let topology = three_tier();
        let mut cloud = dispatcher(fixtures::CLOUD, &topology);
        let mut message = MessageFactory::new(&app()).make(
            "RAW",
            Direction::Up,
            fixtures::CLIENT_MODULE,
            fixtures::SERVICE,
        );
        message.destination_device = Some(fixtures::CLOUD);
        let actions = cloud.on_message(Box::new(message), &Deployment::new(fixtures::CLOUD));
        assert!(matches!(actions[0], Action::RecordCloudTraffic { .. }));
    }

    #[test]
    fn test_actuator_delivery() {
        let topology = three_tier();
        let mut client = dispatcher(fixtures::CLIENT, &topology);
        client.attach_actuator(AttachedActuator {
            id: ActuatorId(5),
            app_id: AppId::new(fixtures::APP),
            actuator_type: fixtures::ACTUATOR_TYPE.into(),
        });

        let mut factory = MessageFactory::new(&app());
        let message = factory.make(
            "SHOW",
            Direction::Actuator,
            fixtures::CLIENT_MODULE,
            fixtures::ACTUATOR_TYPE,
        );
        let deployment = Deployment::new(fixtures::CLIENT);
        let actions = client.on_message(Box::new(message), &deployment);
        assert!(matches!(
            actions.as_slice(),
            [Action::DeliverToActuator {
                actuator: ActuatorId(5),
                ..
            }]
        ));

        let mut named = factory.make(
            "SHOW",
            Direction::Actuator,
            fixtures::CLIENT_MODULE,
            fixtures::ACTUATOR_TYPE,
        );
        named.actuator = Some(ActuatorId(6));
        let actions = client.on_message(Box::new(named), &deployment);
        assert!(matches!(
            actions.as_slice(),
            [Action::RecordDrop {
                reason: DropReason::NoActuator,
                ..
            }]
        ));
    }
}
