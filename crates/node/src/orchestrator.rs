//! Placement orchestration for one domain.

use fogmesh_core::{Action, Event, TimerId};
use fogmesh_placement::{PlacementAlgorithm, PlacementContext, ResourceSnapshot};
use fogmesh_topology::Topology;
use fogmesh_types::{AppId, Application, Applications, DeviceId, PlacementMap, PlacementRequest};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Placement orchestrator of a FON or CLOUD device.
///
/// Owns the queue of pending placement requests and the free-resource
/// snapshot of its domain. Every tick runs the placement algorithm over the
/// queue, turns the result into deployment commands and discovery updates,
/// and drops the requests that were placed.
pub struct Orchestrator {
    root: DeviceId,
    domain: Vec<DeviceId>,
    topology: Arc<Topology>,
    applications: Applications,
    algorithm: Box<dyn PlacementAlgorithm>,
    resources: ResourceSnapshot,
    queue: Vec<PlacementRequest>,
    interval: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("root", &self.root)
            .field("domain", &self.domain.len())
            .field("algorithm", &self.algorithm.name())
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        root: DeviceId,
        topology: Arc<Topology>,
        applications: Applications,
        algorithm: Box<dyn PlacementAlgorithm>,
        interval: Duration,
    ) -> Self {
        let domain = topology.domain(root);
        let resources = domain
            .iter()
            .filter_map(|id| topology.device(*id).map(|d| (d.id, d.capacity)))
            .collect();
        info!(
            root = %root,
            domain = domain.len(),
            algorithm = algorithm.name(),
            "Orchestrator started"
        );
        Self {
            root,
            domain,
            topology,
            applications,
            algorithm,
            resources,
            queue: Vec::new(),
            interval,
        }
    }

    pub fn domain(&self) -> &[DeviceId] {
        &self.domain
    }

    pub fn resources(&self) -> &ResourceSnapshot {
        &self.resources
    }

    /// Requests waiting to be placed, in submission order.
    pub fn pending(&self) -> &[PlacementRequest] {
        &self.queue
    }

    pub fn submit(&mut self, request: PlacementRequest) {
        debug!(root = %self.root, request = %request.id, app = %request.app_id, "Placement request queued");
        self.queue.push(request);
    }

    /// Run one placement cycle and reschedule the next.
    #[instrument(skip(self), fields(root = %self.root, pending = self.queue.len()))]
    pub fn on_placement_timer(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        if !self.queue.is_empty() {
            let ctx = PlacementContext {
                topology: &self.topology,
                root: self.root,
                domain: &self.domain,
                applications: &self.applications,
                resources: &self.resources,
            };
            let placement = self.algorithm.run(&ctx, &self.queue);
            self.algorithm.post_processing(&mut self.resources);

            actions.extend(self.deploy(&placement));
            self.queue.retain(|r| !placement.contains_key(&r.id));

            info!(
                placed = placement.len(),
                pending = self.queue.len(),
                "Placement cycle finished"
            );
            fogmesh_metrics::record_placement_cycle(placement.len(), self.queue.len());
        }

        actions.push(Action::SetTimer {
            id: TimerId::PlacementCycle,
            duration: self.interval,
        });
        actions
    }

    /// Discovery updates and (device, application) grouped launch commands.
    fn deploy(&self, placement: &PlacementMap) -> Vec<Action> {
        let mut actions = Vec::new();
        let mut groups: BTreeMap<(DeviceId, AppId), BTreeSet<String>> = BTreeMap::new();

        for (request_id, assignment) in placement {
            let Some(request) = self.queue.iter().find(|r| r.id == *request_id) else {
                continue;
            };
            let Some(app) = self.applications.get(&request.app_id) else {
                continue;
            };
            for (microservice, device) in assignment {
                groups
                    .entry((*device, app.id.clone()))
                    .or_default()
                    .insert(microservice.clone());

                for client in client_hosts(app, microservice, request, assignment) {
                    actions.push(Action::Deliver {
                        to: client,
                        event: Event::ServiceDiscoveryUpdate {
                            microservice: microservice.clone(),
                            device: *device,
                        },
                    });
                }
            }
        }

        for ((device, app_id), names) in groups {
            debug!(device = %device, app = %app_id, microservices = ?names, "Deploying");
            actions.push(Action::Deliver {
                to: device,
                event: Event::ActivateApplication {
                    app_id: app_id.clone(),
                },
            });
            actions.push(Action::Deliver {
                to: device,
                event: Event::ApplicationReady {
                    app_id: app_id.clone(),
                },
            });
            let declared: Vec<String> = match self.applications.get(&app_id) {
                Some(app) => app
                    .microservices()
                    .iter()
                    .map(|m| m.name.clone())
                    .filter(|name| names.contains(name))
                    .collect(),
                None => names.into_iter().collect(),
            };
            for microservice in declared {
                actions.push(Action::Deliver {
                    to: device,
                    event: Event::LaunchMicroservice {
                        app_id: app_id.clone(),
                        microservice,
                    },
                });
            }
        }
        actions
    }
}

/// Devices hosting the client services of `microservice` for one request.
fn client_hosts(
    app: &Application,
    microservice: &str,
    request: &PlacementRequest,
    assignment: &BTreeMap<String, DeviceId>,
) -> Vec<DeviceId> {
    app.client_services(microservice)
        .into_iter()
        .filter_map(|client| {
            request
                .placed
                .get(client)
                .or_else(|| assignment.get(client))
                .copied()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogmesh_placement::PlacementStrategy;
    use fogmesh_test_helpers::fixtures;
    use fogmesh_topology::TopologyBuilder;
    use fogmesh_types::RequestId;
    use tracing_test::traced_test;

    fn orchestrator(fon_mips: u64, apps: Vec<Application>) -> Orchestrator {
        let topology = Arc::new(
            TopologyBuilder::new(fixtures::two_client_devices(fon_mips))
                .build()
                .unwrap(),
        );
        Orchestrator::new(
            fixtures::FON,
            topology,
            fixtures::applications(apps),
            PlacementStrategy::Edgeward.build(fixtures::FON),
            Duration::from_millis(100),
        )
    }

    fn request(id: u32, app: &str, gateway: DeviceId) -> PlacementRequest {
        PlacementRequest::new(RequestId(id), AppId::new(app), gateway)
            .with_placed(fixtures::CLIENT_MODULE, gateway)
    }

    fn delivered(actions: &[Action]) -> Vec<(DeviceId, &Event)> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Deliver { to, event } => Some((*to, event)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_queue_only_reschedules() {
        let mut orch = orchestrator(1000, vec![fixtures::single_service_app(fixtures::APP, 500)]);
        let actions = orch.on_placement_timer();
        assert!(matches!(
            actions.as_slice(),
            [Action::SetTimer {
                id: TimerId::PlacementCycle,
                ..
            }]
        ));
    }

    #[traced_test]
    #[test]
    fn test_cycle_launches_and_announces() {
        let mut orch = orchestrator(1000, vec![fixtures::single_service_app(fixtures::APP, 500)]);
        orch.submit(request(1, fixtures::APP, fixtures::CLIENT));

        let actions = orch.on_placement_timer();
        let events = delivered(&actions);

        assert!(events.iter().any(|(to, e)| *to == fixtures::CLIENT
            && matches!(e, Event::ServiceDiscoveryUpdate { microservice, device }
                if microservice == fixtures::SERVICE && *device == fixtures::FON)));
        let launches: Vec<_> = events
            .iter()
            .filter(|(_, e)| matches!(e, Event::LaunchMicroservice { .. }))
            .collect();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].0, fixtures::FON);
        assert!(orch.pending().is_empty());
        assert_eq!(orch.resources().free_cpu(fixtures::FON), 500);
        assert!(matches!(actions.last(), Some(Action::SetTimer { .. })));
        assert!(logs_contain("Placement cycle finished"));
    }

    #[test]
    fn test_launches_grouped_per_device_and_application() {
        let mut orch = orchestrator(2000, vec![fixtures::single_service_app(fixtures::APP, 500)]);
        orch.submit(request(1, fixtures::APP, fixtures::CLIENT));
        orch.submit(request(2, fixtures::APP, fixtures::CLIENT_B));

        let actions = orch.on_placement_timer();
        let events = delivered(&actions);
        let activations = events
            .iter()
            .filter(|(_, e)| matches!(e, Event::ActivateApplication { .. }))
            .count();
        let launches = events
            .iter()
            .filter(|(_, e)| matches!(e, Event::LaunchMicroservice { .. }))
            .count();
        assert_eq!(activations, 1);
        assert_eq!(launches, 1);

        // Both clients learn about the shared host.
        let announced: BTreeSet<DeviceId> = events
            .iter()
            .filter(|(_, e)| matches!(e, Event::ServiceDiscoveryUpdate { .. }))
            .map(|(to, _)| *to)
            .collect();
        assert_eq!(announced, BTreeSet::from([fixtures::CLIENT, fixtures::CLIENT_B]));
    }

    #[test]
    fn test_chain_discovery_goes_to_upstream_host() {
        let app = fixtures::chain_app(fixtures::APP, &[("ingest", 200), ("analyse", 300)]);
        let mut orch = orchestrator(1000, vec![app]);
        orch.submit(request(1, fixtures::APP, fixtures::CLIENT));

        let actions = orch.on_placement_timer();
        let updates: Vec<_> = delivered(&actions)
            .into_iter()
            .filter_map(|(to, e)| match e {
                Event::ServiceDiscoveryUpdate { microservice, .. } => {
                    Some((to, microservice.as_str()))
                }
                _ => None,
            })
            .collect();
        assert!(updates.contains(&(fixtures::CLIENT, "ingest")));
        assert!(updates.contains(&(fixtures::FON, "analyse")));
    }

    #[test]
    fn test_launch_order_follows_declaration() {
        let app = fixtures::chain_app(fixtures::APP, &[("zeta", 200), ("alpha", 300)]);
        let mut orch = orchestrator(1000, vec![app]);
        orch.submit(request(1, fixtures::APP, fixtures::CLIENT));

        let actions = orch.on_placement_timer();
        let launched: Vec<&str> = delivered(&actions)
            .into_iter()
            .filter_map(|(_, e)| match e {
                Event::LaunchMicroservice { microservice, .. } => Some(microservice.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(launched, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_unplaceable_request_stays_queued() {
        // The FON domain cannot hold 5000 MIPS; the cloud is outside it.
        let mut orch = orchestrator(1000, vec![fixtures::single_service_app(fixtures::APP, 5000)]);
        orch.submit(request(1, fixtures::APP, fixtures::CLIENT));

        let actions = orch.on_placement_timer();
        assert_eq!(orch.pending().len(), 1);
        assert!(delivered(&actions).is_empty());
        assert_eq!(orch.resources().free_cpu(fixtures::FON), 1000);
    }
}
