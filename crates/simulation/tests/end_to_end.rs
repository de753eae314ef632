//! End-to-end runs: placement, discovery, routing, execution and loops.

use fogmesh_core::{DropReason, EventPriority};
use fogmesh_node::NodeError;
use fogmesh_simulation::{ActuatorSpec, SensorSpec, SetupError, SimulationConfig, SimulationRunner};
use fogmesh_test_helpers::fixtures;
use fogmesh_topology::TopologyBuilder;
use fogmesh_types::{ActuatorId, AppId, Application, DeviceId, DeviceRole, DeviceSpec, SensorId};
use std::time::Duration;
use tracing_test::traced_test;

fn secs(v: u64) -> Duration {
    Duration::from_secs(v)
}

fn app_id() -> AppId {
    AppId::new(fixtures::APP)
}

/// Runner over `devices` with one sensor and one actuator per client in `clients`.
fn runner(
    devices: Vec<DeviceSpec>,
    app: Application,
    clients: &[DeviceId],
    seed: u64,
) -> SimulationRunner {
    let topology = TopologyBuilder::new(devices)
        .with_cluster_level(fixtures::GATEWAY_LEVEL)
        .with_cluster_latency(Duration::from_millis(2))
        .build()
        .unwrap();
    let config = SimulationConfig::default().with_placement_interval(Duration::from_millis(100));
    let mut runner = SimulationRunner::new(topology, [app], config, seed).unwrap();
    for (i, client) in clients.iter().enumerate() {
        runner
            .add_sensor(SensorSpec::new(
                SensorId(i as u32),
                *client,
                app_id(),
                fixtures::SENSOR_TYPE,
            ))
            .unwrap();
        runner
            .add_actuator(ActuatorSpec::new(
                ActuatorId(i as u32),
                *client,
                app_id(),
                fixtures::ACTUATOR_TYPE,
            ))
            .unwrap();
    }
    runner
}

#[traced_test]
#[test]
fn test_service_placed_on_fon_closes_loop() {
    let mut runner = runner(
        fixtures::three_tier_devices(1000),
        fixtures::single_service_app(fixtures::APP, 500),
        &[fixtures::CLIENT],
        7,
    );
    runner.run_until(secs(30));

    let fon = runner.device(fixtures::FON).unwrap();
    assert!(fon.deployment().hosts(&app_id(), fixtures::SERVICE));
    assert!(!runner
        .device(fixtures::CLOUD)
        .unwrap()
        .deployment()
        .hosts(&app_id(), fixtures::SERVICE));
    assert!(runner
        .device(fixtures::CLIENT)
        .unwrap()
        .deployment()
        .hosts(&app_id(), fixtures::CLIENT_MODULE));

    let stats = runner.stats();
    assert!(stats.sensor_emissions >= 5);
    assert!(stats.actuator_deliveries >= 1);
    assert_eq!(stats.messages_dropped(), 0);
    assert_eq!(stats.cloud_traffic, 0);
    assert!(stats.network_usage > 0.0);

    // client (1s) + service (4s) + client (0.5s) plus network.
    let latency = stats.average_loop_latency(&app_id(), 0).unwrap();
    assert!(latency > 5.5 && latency < 6.0, "loop latency {latency}");
    assert_eq!(stats.average_cpu_time("RAW"), Some(4.0));

    assert!(logs_contain("Placement cycle finished"));
}

#[test]
fn test_overflow_runs_in_cloud() {
    // The middle tier is a plain computation node, so the cloud orchestrates.
    let mut devices = fixtures::three_tier_devices(1000);
    devices[1].role = DeviceRole::Fcn;

    let mut runner = runner(
        devices,
        fixtures::single_service_app(fixtures::APP, 1500),
        &[fixtures::CLIENT],
        7,
    );
    runner.run_until(secs(30));

    let cloud = runner.device(fixtures::CLOUD).unwrap();
    assert!(cloud.deployment().hosts(&app_id(), fixtures::SERVICE));
    assert_eq!(
        cloud
            .orchestrator()
            .unwrap()
            .resources()
            .free_cpu(fixtures::CLOUD),
        10_000 - 1500
    );
    assert!(!runner
        .device(fixtures::FON)
        .unwrap()
        .deployment()
        .hosts(&app_id(), fixtures::SERVICE));

    let stats = runner.stats();
    assert!(stats.cloud_traffic >= 1);
    assert!(stats.actuator_deliveries >= 1);
    assert_eq!(stats.messages_dropped(), 0);
}

#[test]
fn test_unplaceable_request_leaves_output_unresolvable() {
    // 5000 MIPS fit nowhere in the FON domain: the request stays queued and
    // client output has nowhere to go.
    let mut runner = runner(
        fixtures::three_tier_devices(1000),
        fixtures::single_service_app(fixtures::APP, 5000),
        &[fixtures::CLIENT],
        7,
    );
    runner.run_until(secs(12));

    let fon = runner.device(fixtures::FON).unwrap();
    assert_eq!(fon.orchestrator().unwrap().pending().len(), 1);
    let stats = runner.stats();
    assert!(stats.drops_for(DropReason::Unresolvable) >= 1);
    assert_eq!(stats.actuator_deliveries, 0);
}

#[test]
fn test_clustered_gateways_serve_their_clients() {
    let app = fixtures::chain_app(fixtures::APP, &[("ingest", 300), ("analyse", 600)]);
    let clients = fixtures::client_ids(3, 2);
    let mut runner = runner(fixtures::clustered_devices(3, 2), app, &clients, 11);
    runner.run_until(secs(40));

    for gw in fixtures::gateway_ids(3) {
        let deployment = runner.device(gw).unwrap().deployment();
        assert!(deployment.hosts(&app_id(), "ingest"));
        assert!(deployment.hosts(&app_id(), "analyse"));
    }
    assert!(runner
        .device(fixtures::PROXY)
        .unwrap()
        .orchestrator()
        .unwrap()
        .pending()
        .is_empty());

    let stats = runner.stats();
    assert!(stats.actuator_deliveries >= clients.len() as u64);
    assert_eq!(stats.messages_dropped(), 0);
    assert_eq!(stats.cloud_traffic, 0);
}

#[test]
fn test_duplicate_client_module_is_a_setup_error() {
    let mut runner = runner(
        fixtures::three_tier_devices(1000),
        fixtures::single_service_app(fixtures::APP, 500),
        &[fixtures::CLIENT],
        1,
    );
    let err = runner
        .add_sensor(SensorSpec::new(
            SensorId(9),
            fixtures::CLIENT,
            app_id(),
            fixtures::SENSOR_TYPE,
        ))
        .unwrap_err();
    assert_eq!(
        err,
        SetupError::Node(NodeError::DuplicateClientModule {
            device: fixtures::CLIENT,
            app: app_id()
        })
    );
}

#[test]
fn test_sensor_validation() {
    let mut runner = runner(
        fixtures::two_client_devices(1000),
        fixtures::single_service_app(fixtures::APP, 500),
        &[],
        1,
    );
    assert_eq!(
        runner.add_sensor(SensorSpec::new(SensorId(1), DeviceId(99), app_id(), fixtures::SENSOR_TYPE)),
        Err(SetupError::UnknownDevice(DeviceId(99)))
    );
    assert_eq!(
        runner.add_sensor(SensorSpec::new(SensorId(1), fixtures::CLIENT, "nope", fixtures::SENSOR_TYPE)),
        Err(SetupError::UnknownApplication(AppId::new("nope")))
    );
    assert!(matches!(
        runner.add_sensor(SensorSpec::new(SensorId(1), fixtures::CLIENT, app_id(), "CAMERA")),
        Err(SetupError::UnknownSensorType { .. })
    ));
    assert_eq!(
        runner.add_sensor(
            SensorSpec::new(SensorId(1), fixtures::CLIENT, app_id(), fixtures::SENSOR_TYPE)
                .with_interval(Duration::ZERO)
        ),
        Err(SetupError::ZeroInterval(SensorId(1)))
    );

    runner
        .add_sensor(SensorSpec::new(SensorId(1), fixtures::CLIENT, app_id(), fixtures::SENSOR_TYPE))
        .unwrap();
    assert_eq!(
        runner.add_sensor(SensorSpec::new(
            SensorId(1),
            fixtures::CLIENT_B,
            app_id(),
            fixtures::SENSOR_TYPE
        )),
        Err(SetupError::DuplicateSensor(SensorId(1)))
    );
}

#[test]
fn test_two_clients_share_one_fon_instance() {
    let mut runner = runner(
        fixtures::two_client_devices(2000),
        fixtures::single_service_app(fixtures::APP, 500),
        &[fixtures::CLIENT, fixtures::CLIENT_B],
        3,
    );
    runner.run_until(secs(30));

    let fon = runner.device(fixtures::FON).unwrap();
    assert_eq!(fon.deployment().instances_of(&app_id(), fixtures::SERVICE).len(), 1);
    let stats = runner.stats();
    assert!(stats.actuator_deliveries >= 2);
    assert_eq!(stats.messages_dropped(), 0);
}

#[traced_test]
#[test]
fn test_sensor_ticks_and_executions_stay_in_the_runner() {
    let mut runner = runner(
        fixtures::three_tier_devices(1000),
        fixtures::single_service_app(fixtures::APP, 500),
        &[fixtures::CLIENT],
        11,
    );
    runner.run_until(secs(20));

    let stats = runner.stats();
    // Every client-priority entry is a sensor tick and each tick emits once.
    assert!(stats.sensor_emissions > 0);
    assert_eq!(
        stats.events_by_priority[EventPriority::Client as usize],
        stats.sensor_emissions
    );
    assert!(stats.executions > 0);
    assert!(!logs_contain("Event for unknown device"));
}
