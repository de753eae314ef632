//! Scenario configuration loaded from TOML.

use crate::ScenarioError;
use fogmesh_placement::PlacementStrategy;
use fogmesh_simulation::{ActuatorSpec, SensorSpec, SimulationConfig};
use fogmesh_topology::{Topology, TopologyBuilder};
use fogmesh_types::{
    ActuatorId, AppEdge, Application, DeviceId, DeviceRole, DeviceSpec, Direction, EdgeKind,
    Resources, SensorId, Selectivity, UserId,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// A complete simulation scenario.
///
/// ```toml
/// duration_secs = 60
/// placement_interval_ms = 1000
/// strategy = "edgeward"
/// cluster_levels = ["gw"]
/// cluster_latency_ms = 2
///
/// [[devices]]
/// id = 0
/// name = "cloud"
/// role = "cloud"
/// mips = 44800
///
/// [[devices]]
/// id = 1
/// name = "proxy"
/// role = "fon"
/// mips = 2800
/// parent = 0
/// uplink_latency_ms = 100
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Seed used when the command line does not provide one.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    #[serde(default = "default_placement_interval_ms")]
    pub placement_interval_ms: u64,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub cluster_levels: Vec<String>,
    #[serde(default)]
    pub cluster_latency_ms: u64,
    pub devices: Vec<DeviceConfig>,
    pub applications: Vec<ApplicationConfig>,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
    #[serde(default)]
    pub actuators: Vec<ActuatorConfig>,
}

fn default_duration_secs() -> u64 {
    60
}

fn default_placement_interval_ms() -> u64 {
    1000
}

fn default_strategy() -> String {
    PlacementStrategy::default().as_str().to_owned()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub id: u32,
    pub name: String,
    pub role: DeviceRole,
    pub mips: u64,
    #[serde(default)]
    pub ram_mb: u64,
    #[serde(default)]
    pub storage_mb: u64,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub uplink_latency_ms: u64,
    #[serde(default)]
    pub level: Option<String>,
    /// Bytes per second; all three default to [`DeviceSpec::DEFAULT_BANDWIDTH`].
    #[serde(default)]
    pub uplink_bandwidth: Option<f64>,
    #[serde(default)]
    pub downlink_bandwidth: Option<f64>,
    #[serde(default)]
    pub cluster_bandwidth: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationConfig {
    pub id: String,
    #[serde(default)]
    pub user: u32,
    #[serde(default = "default_client_module")]
    pub client_module: String,
    pub microservices: Vec<MicroserviceConfig>,
    pub edges: Vec<EdgeConfig>,
    #[serde(default)]
    pub selectivities: Vec<SelectivityConfig>,
    #[serde(default)]
    pub loops: Vec<Vec<String>>,
}

fn default_client_module() -> String {
    Application::CLIENT_MODULE.to_owned()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MicroserviceConfig {
    pub name: String,
    pub mips: u64,
    #[serde(default)]
    pub ram_mb: u64,
    #[serde(default)]
    pub size_mb: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeConfig {
    pub kind: EdgeKind,
    pub source: String,
    pub destination: String,
    /// Ignored for sensor edges, whose tuple type is the sensor type.
    #[serde(default)]
    pub tuple_type: Option<String>,
    #[serde(default = "default_direction")]
    pub direction: Direction,
    pub cpu_length: u64,
    pub nw_length: u64,
}

fn default_direction() -> Direction {
    Direction::Up
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectivityConfig {
    pub microservice: String,
    pub input: String,
    pub output: String,
    #[serde(default = "default_selectivity")]
    pub value: f64,
}

fn default_selectivity() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub id: u32,
    pub gateway: u32,
    pub app: String,
    pub tuple_type: String,
    #[serde(default = "default_sensor_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_sensor_latency_ms")]
    pub latency_ms: u64,
}

fn default_sensor_interval_ms() -> u64 {
    SensorSpec::DEFAULT_INTERVAL.as_millis() as u64
}

fn default_sensor_latency_ms() -> u64 {
    SensorSpec::DEFAULT_LATENCY.as_millis() as u64
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActuatorConfig {
    pub id: u32,
    pub device: u32,
    pub app: String,
    pub actuator_type: String,
    #[serde(default = "default_actuator_latency_ms")]
    pub latency_ms: u64,
}

fn default_actuator_latency_ms() -> u64 {
    ActuatorSpec::DEFAULT_LATENCY.as_millis() as u64
}

impl ScenarioConfig {
    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(text)?)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn simulation_config(&self) -> Result<SimulationConfig, ScenarioError> {
        let strategy: PlacementStrategy = self.strategy.parse()?;
        Ok(SimulationConfig::default()
            .with_placement_interval(ms(self.placement_interval_ms))
            .with_strategy(strategy))
    }

    pub fn topology(&self) -> Result<Topology, ScenarioError> {
        let devices = self.devices.iter().map(DeviceConfig::to_spec).collect();
        Ok(TopologyBuilder::new(devices)
            .with_cluster_levels(self.cluster_levels.iter().cloned())
            .with_cluster_latency(ms(self.cluster_latency_ms))
            .build()?)
    }

    pub fn applications(&self) -> Result<Vec<Application>, ScenarioError> {
        self.applications
            .iter()
            .map(ApplicationConfig::to_application)
            .collect()
    }

    pub fn sensors(&self) -> impl Iterator<Item = SensorSpec> + '_ {
        self.sensors.iter().map(|s| {
            SensorSpec::new(
                SensorId(s.id),
                DeviceId(s.gateway),
                s.app.as_str(),
                s.tuple_type.clone(),
            )
            .with_interval(ms(s.interval_ms))
            .with_latency(ms(s.latency_ms))
        })
    }

    pub fn actuators(&self) -> impl Iterator<Item = ActuatorSpec> + '_ {
        self.actuators.iter().map(|a| {
            ActuatorSpec::new(
                ActuatorId(a.id),
                DeviceId(a.device),
                a.app.as_str(),
                a.actuator_type.clone(),
            )
            .with_latency(ms(a.latency_ms))
        })
    }
}

impl DeviceConfig {
    fn to_spec(&self) -> DeviceSpec {
        let mut spec = DeviceSpec::new(
            DeviceId(self.id),
            self.name.clone(),
            self.role,
            Resources::new(self.mips, self.ram_mb, self.storage_mb),
        );
        if let Some(parent) = self.parent {
            spec = spec.with_parent(DeviceId(parent), ms(self.uplink_latency_ms));
        }
        if let Some(level) = &self.level {
            spec = spec.with_level(level.clone());
        }
        spec.with_bandwidths(
            self.uplink_bandwidth.unwrap_or(DeviceSpec::DEFAULT_BANDWIDTH),
            self.downlink_bandwidth.unwrap_or(DeviceSpec::DEFAULT_BANDWIDTH),
            self.cluster_bandwidth.unwrap_or(DeviceSpec::DEFAULT_BANDWIDTH),
        )
    }
}

impl ApplicationConfig {
    fn to_application(&self) -> Result<Application, ScenarioError> {
        let mut app = Application::new(self.id.as_str(), UserId(self.user))
            .with_client_module(self.client_module.clone());

        for m in &self.microservices {
            let microservice = app.add_microservice(m.name.clone(), m.mips);
            microservice.ram_mb = m.ram_mb;
            microservice.size_mb = m.size_mb;
        }

        for edge in &self.edges {
            let tuple_type = edge
                .tuple_type
                .clone()
                .unwrap_or_else(|| edge.source.clone());
            app.add_edge(match edge.kind {
                EdgeKind::Sensor => AppEdge::sensor(
                    edge.source.clone(),
                    edge.destination.clone(),
                    edge.cpu_length,
                    edge.nw_length,
                ),
                EdgeKind::Module => AppEdge::module(
                    edge.source.clone(),
                    edge.destination.clone(),
                    tuple_type,
                    edge.direction,
                    edge.cpu_length,
                    edge.nw_length,
                ),
                EdgeKind::Actuator => AppEdge::actuator(
                    edge.source.clone(),
                    edge.destination.clone(),
                    tuple_type,
                    edge.cpu_length,
                    edge.nw_length,
                ),
            });
        }

        for s in &self.selectivities {
            let selectivity = Selectivity::Fractional(s.value);
            if !app.add_selectivity(&s.microservice, s.input.clone(), s.output.clone(), selectivity) {
                return Err(ScenarioError::UnknownMicroservice {
                    app: self.id.clone(),
                    microservice: s.microservice.clone(),
                });
            }
        }

        for modules in &self.loops {
            app.add_loop(modules.clone());
        }
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogmesh_types::ConfigError;

    const SCENARIO: &str = r#"
duration_secs = 20
placement_interval_ms = 500

[[devices]]
id = 0
name = "cloud"
role = "cloud"
mips = 10000

[[devices]]
id = 1
name = "fon"
role = "fon"
mips = 1000
parent = 0
uplink_latency_ms = 100

[[devices]]
id = 2
name = "client"
role = "client"
mips = 500
parent = 1
uplink_latency_ms = 2
uplink_bandwidth = 1000.0

[[applications]]
id = "app"
user = 1

[[applications.microservices]]
name = "client"
mips = 1000

[[applications.microservices]]
name = "service"
mips = 500

[[applications.edges]]
kind = "sensor"
source = "SENSOR"
destination = "client"
cpu_length = 1000
nw_length = 2000

[[applications.edges]]
kind = "module"
source = "client"
destination = "service"
tuple_type = "RAW"
cpu_length = 2000
nw_length = 1000

[[applications.edges]]
kind = "module"
source = "service"
destination = "client"
tuple_type = "RESULT"
direction = "down"
cpu_length = 500
nw_length = 500

[[applications.selectivities]]
microservice = "client"
input = "SENSOR"
output = "RAW"

[[applications.selectivities]]
microservice = "service"
input = "RAW"
output = "RESULT"
value = 0.5

[[sensors]]
id = 0
gateway = 2
app = "app"
tuple_type = "SENSOR"
interval_ms = 2000

[[actuators]]
id = 0
device = 2
app = "app"
actuator_type = "DISPLAY"
"#;

    #[test]
    fn test_parse_scenario() {
        let config = ScenarioConfig::from_toml(SCENARIO).unwrap();
        assert_eq!(config.duration(), Duration::from_secs(20));
        assert_eq!(config.strategy, "edgeward");
        assert_eq!(config.devices[2].role, DeviceRole::Client);

        let topology = config.topology().unwrap();
        let client = topology.device(DeviceId(2)).unwrap();
        assert_eq!(client.parent, Some(DeviceId(1)));
        assert_eq!(client.uplink_bandwidth, 1000.0);
        assert_eq!(client.downlink_bandwidth, DeviceSpec::DEFAULT_BANDWIDTH);

        let apps = config.applications().unwrap();
        let app = &apps[0];
        assert_eq!(app.client_module, Application::CLIENT_MODULE);
        assert_eq!(app.edges()[2].direction, Direction::Down);
        assert_eq!(app.sensor_edge("SENSOR").map(|e| e.destination.as_str()), Some("client"));
        assert_eq!(
            app.microservice("service").and_then(|m| m.selectivity("RAW", "RESULT")),
            Some(&Selectivity::Fractional(0.5))
        );

        let sensor = config.sensors().next().unwrap();
        assert_eq!(sensor.interval, Duration::from_secs(2));
        assert_eq!(sensor.latency, SensorSpec::DEFAULT_LATENCY);
        let actuator = config.actuators().next().unwrap();
        assert_eq!(actuator.latency, ActuatorSpec::DEFAULT_LATENCY);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = SCENARIO.replace("duration_secs = 20", "duration = 20");
        assert!(matches!(
            ScenarioConfig::from_toml(&text),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let mut config = ScenarioConfig::from_toml(SCENARIO).unwrap();
        config.strategy = "random".into();
        assert!(matches!(
            config.simulation_config(),
            Err(ScenarioError::Config(ConfigError::UnknownStrategy(_)))
        ));
    }

    #[test]
    fn test_selectivity_for_unknown_microservice() {
        let text = SCENARIO.replace("microservice = \"service\"", "microservice = \"missing\"");
        let config = ScenarioConfig::from_toml(&text).unwrap();
        assert!(matches!(
            config.applications(),
            Err(ScenarioError::UnknownMicroservice { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ScenarioConfig::load(Path::new("/nonexistent/scenario.toml")).unwrap_err();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }
}
