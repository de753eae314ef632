//! Built-in demo scenario.
//!
//! ```text
//! cloud(0) ── proxy(1, FON) ── gw-i(10+i, FCN) ── client-i-j(100+i*n+j)
//! ```
//!
//! Every client carries a sensor and a display for the `demo` application:
//!
//! ```text
//! SENSOR → client → ingest → analyse → client → DISPLAY
//! ```
//!
//! A gateway fits one client's ingest and analyse; with a second client the
//! analyse slots shift up to the proxy.

use crate::config::{
    ActuatorConfig, ApplicationConfig, DeviceConfig, EdgeConfig, MicroserviceConfig,
    ScenarioConfig, SelectivityConfig, SensorConfig,
};
use fogmesh_types::{Application, DeviceRole, Direction, EdgeKind};

pub const DEMO_APP: &str = "demo";
pub const GATEWAY_LEVEL: &str = "gw";

const SENSOR_TYPE: &str = "SENSOR";
const ACTUATOR_TYPE: &str = "DISPLAY";

fn device(id: u32, name: String, role: DeviceRole, mips: u64) -> DeviceConfig {
    DeviceConfig {
        id,
        name,
        role,
        mips,
        ram_mb: mips,
        storage_mb: 10_000,
        parent: None,
        uplink_latency_ms: 0,
        level: None,
        uplink_bandwidth: None,
        downlink_bandwidth: None,
        cluster_bandwidth: None,
    }
}

fn child(mut device: DeviceConfig, parent: u32, latency_ms: u64) -> DeviceConfig {
    device.parent = Some(parent);
    device.uplink_latency_ms = latency_ms;
    device
}

fn edge(
    kind: EdgeKind,
    source: &str,
    destination: &str,
    tuple_type: &str,
    direction: Direction,
    cpu_length: u64,
    nw_length: u64,
) -> EdgeConfig {
    EdgeConfig {
        kind,
        source: source.to_owned(),
        destination: destination.to_owned(),
        tuple_type: Some(tuple_type.to_owned()),
        direction,
        cpu_length,
        nw_length,
    }
}

fn selectivity(microservice: &str, input: &str, output: &str) -> SelectivityConfig {
    SelectivityConfig {
        microservice: microservice.to_owned(),
        input: input.to_owned(),
        output: output.to_owned(),
        value: 1.0,
    }
}

fn demo_application() -> ApplicationConfig {
    let client = Application::CLIENT_MODULE;
    let microservice = |name: &str, mips: u64| MicroserviceConfig {
        name: name.to_owned(),
        mips,
        ram_mb: 0,
        size_mb: 0,
    };

    ApplicationConfig {
        id: DEMO_APP.to_owned(),
        user: 1,
        client_module: client.to_owned(),
        microservices: vec![
            microservice(client, 1_000),
            microservice("ingest", 500),
            microservice("analyse", 1_000),
        ],
        edges: vec![
            edge(EdgeKind::Sensor, SENSOR_TYPE, client, SENSOR_TYPE, Direction::Up, 1_000, 2_000),
            edge(EdgeKind::Module, client, "ingest", "RAW", Direction::Up, 2_000, 1_000),
            edge(EdgeKind::Module, "ingest", "analyse", "INGESTED", Direction::Up, 2_000, 1_000),
            edge(EdgeKind::Module, "analyse", client, "RESULT", Direction::Down, 500, 500),
            edge(EdgeKind::Actuator, client, ACTUATOR_TYPE, "SHOW", Direction::Actuator, 100, 100),
        ],
        selectivities: vec![
            selectivity(client, SENSOR_TYPE, "RAW"),
            selectivity("ingest", "RAW", "INGESTED"),
            selectivity("analyse", "INGESTED", "RESULT"),
            selectivity(client, "RESULT", "SHOW"),
        ],
        loops: vec![[SENSOR_TYPE, client, "ingest", "analyse", client, ACTUATOR_TYPE]
            .iter()
            .map(|m| m.to_string())
            .collect()],
    }
}

impl ScenarioConfig {
    /// The built-in scenario with `gateways` gateways of
    /// `clients_per_gateway` clients each.
    pub fn demo(gateways: u32, clients_per_gateway: u32) -> Self {
        let mut devices = vec![
            device(0, "cloud".into(), DeviceRole::Cloud, 44_800),
            child(device(1, "proxy".into(), DeviceRole::Fon, 4_000), 0, 100),
        ];
        let mut sensors = Vec::new();
        let mut actuators = Vec::new();

        for i in 0..gateways {
            let gateway = 10 + i;
            devices.push(child(
                device(gateway, format!("{GATEWAY_LEVEL}-{i}"), DeviceRole::Fcn, 2_800),
                1,
                4,
            ));
            for j in 0..clients_per_gateway {
                let id = 100 + i * clients_per_gateway + j;
                devices.push(child(
                    device(id, format!("client-{i}-{j}"), DeviceRole::Client, 500),
                    gateway,
                    2,
                ));
                let index = sensors.len() as u32;
                sensors.push(SensorConfig {
                    id: index,
                    gateway: id,
                    app: DEMO_APP.to_owned(),
                    tuple_type: SENSOR_TYPE.to_owned(),
                    interval_ms: 5_000,
                    latency_ms: 6,
                });
                actuators.push(ActuatorConfig {
                    id: index,
                    device: id,
                    app: DEMO_APP.to_owned(),
                    actuator_type: ACTUATOR_TYPE.to_owned(),
                    latency_ms: 1,
                });
            }
        }

        ScenarioConfig {
            seed: None,
            duration_secs: 60,
            placement_interval_ms: 1_000,
            strategy: "edgeward".to_owned(),
            cluster_levels: vec![GATEWAY_LEVEL.to_owned()],
            cluster_latency_ms: 2,
            devices,
            applications: vec![demo_application()],
            sensors,
            actuators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogmesh_types::DeviceId;

    #[test]
    fn test_demo_builds() {
        let config = ScenarioConfig::demo(2, 3);
        let topology = config.topology().unwrap();
        assert_eq!(topology.len(), 2 + 2 + 6);
        assert_eq!(config.sensors().count(), 6);
        assert_eq!(topology.cluster_siblings(DeviceId(10)).collect::<Vec<_>>(), vec![DeviceId(11)]);

        let apps = config.applications().unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].loops().len(), 1);
        assert_eq!(apps[0].mips_of("analyse"), 1_000);
    }
}
