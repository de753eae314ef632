//! Application model: microservices, the edges between them, and loops.

use crate::{AppId, ConfigError, Message, MessageId, UserId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Registry of applications keyed by id.
pub type Applications = BTreeMap<AppId, Arc<Application>>;

/// Direction of a message (and of the application edge that produces it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards the cloud.
    Up,
    /// Towards the edge.
    Down,
    /// To an actuator attached to the current device.
    Actuator,
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "actuator" => Ok(Direction::Actuator),
            _ => Err(ConfigError::UnknownDirection(s.to_owned())),
        }
    }
}

/// What kind of endpoints an application edge connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Sensor tuple type → microservice.
    Sensor,
    /// Microservice → microservice.
    Module,
    /// Microservice → actuator type.
    Actuator,
}

/// Probability model deciding whether an input produces an output on an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selectivity {
    /// Emit with the given probability (1.0 = always).
    Fractional(f64),
}

impl Selectivity {
    /// Decide whether this input produces an output.
    ///
    /// The RNG is only consulted for fractions strictly between 0 and 1.
    pub fn selects<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        match *self {
            Selectivity::Fractional(f) if f >= 1.0 => true,
            Selectivity::Fractional(f) if f <= 0.0 => false,
            Selectivity::Fractional(f) => rng.gen::<f64>() < f,
        }
    }
}

/// A deployable unit of application logic.
#[derive(Debug, Clone, PartialEq)]
pub struct Microservice {
    pub name: String,
    /// CPU demand of one instance in MIPS.
    pub mips: u64,
    pub ram_mb: u64,
    pub size_mb: u64,
    /// (input tuple type, output tuple type) → selectivity.
    selectivity: BTreeMap<(String, String), Selectivity>,
}

impl Microservice {
    pub fn new(name: impl Into<String>, mips: u64) -> Self {
        Self {
            name: name.into(),
            mips,
            ram_mb: 0,
            size_mb: 0,
            selectivity: BTreeMap::new(),
        }
    }

    pub fn selectivity(&self, input: &str, output: &str) -> Option<&Selectivity> {
        self.selectivity.get(&(input.to_owned(), output.to_owned()))
    }
}

/// Directed application edge.
#[derive(Debug, Clone, PartialEq)]
pub struct AppEdge {
    pub source: String,
    pub destination: String,
    pub tuple_type: String,
    pub direction: Direction,
    pub kind: EdgeKind,
    /// CPU length of produced messages (MI).
    pub cpu_length: u64,
    /// Network size of produced messages (bytes).
    pub nw_length: u64,
}

impl AppEdge {
    /// Microservice → microservice edge.
    pub fn module(
        source: impl Into<String>,
        destination: impl Into<String>,
        tuple_type: impl Into<String>,
        direction: Direction,
        cpu_length: u64,
        nw_length: u64,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            tuple_type: tuple_type.into(),
            direction,
            kind: EdgeKind::Module,
            cpu_length,
            nw_length,
        }
    }

    /// Sensor → microservice edge. The sensor's tuple type is both the source
    /// and the tuple type of the edge.
    pub fn sensor(
        sensor_type: impl Into<String>,
        destination: impl Into<String>,
        cpu_length: u64,
        nw_length: u64,
    ) -> Self {
        let sensor_type = sensor_type.into();
        Self {
            source: sensor_type.clone(),
            destination: destination.into(),
            tuple_type: sensor_type,
            direction: Direction::Up,
            kind: EdgeKind::Sensor,
            cpu_length,
            nw_length,
        }
    }

    /// Microservice → actuator edge.
    pub fn actuator(
        source: impl Into<String>,
        actuator_type: impl Into<String>,
        tuple_type: impl Into<String>,
        cpu_length: u64,
        nw_length: u64,
    ) -> Self {
        Self {
            source: source.into(),
            destination: actuator_type.into(),
            tuple_type: tuple_type.into(),
            direction: Direction::Actuator,
            kind: EdgeKind::Actuator,
            cpu_length,
            nw_length,
        }
    }
}

/// A chain of modules whose end-to-end latency is tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLoop {
    pub id: u32,
    pub modules: Vec<String>,
}

/// A microservice-based application.
///
/// Microservices keep their declaration order, which is the iteration order
/// placement uses to stay reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub id: AppId,
    pub user: UserId,
    /// Name of the module pinned on the client device.
    pub client_module: String,
    microservices: Vec<Microservice>,
    edges: Vec<AppEdge>,
    loops: Vec<AppLoop>,
}

impl Application {
    /// Default client module name.
    pub const CLIENT_MODULE: &'static str = "client";

    pub fn new(id: impl Into<AppId>, user: UserId) -> Self {
        Self {
            id: id.into(),
            user,
            client_module: Self::CLIENT_MODULE.to_owned(),
            microservices: Vec::new(),
            edges: Vec::new(),
            loops: Vec::new(),
        }
    }

    // ─── Construction ───

    pub fn with_client_module(mut self, name: impl Into<String>) -> Self {
        self.client_module = name.into();
        self
    }

    pub fn add_microservice(&mut self, name: impl Into<String>, mips: u64) -> &mut Microservice {
        self.microservices.push(Microservice::new(name, mips));
        let last = self.microservices.len() - 1;
        &mut self.microservices[last]
    }

    pub fn add_edge(&mut self, edge: AppEdge) {
        self.edges.push(edge);
    }

    /// Register a selectivity for `microservice` mapping `input` to `output`.
    ///
    /// Returns false when the microservice is unknown.
    pub fn add_selectivity(
        &mut self,
        microservice: &str,
        input: impl Into<String>,
        output: impl Into<String>,
        selectivity: Selectivity,
    ) -> bool {
        match self.microservices.iter_mut().find(|m| m.name == microservice) {
            Some(m) => {
                m.selectivity
                    .insert((input.into(), output.into()), selectivity);
                true
            }
            None => false,
        }
    }

    pub fn add_loop(&mut self, modules: Vec<String>) -> u32 {
        let id = self.loops.len() as u32;
        self.loops.push(AppLoop { id, modules });
        id
    }

    // ─── Queries ───

    pub fn microservices(&self) -> &[Microservice] {
        &self.microservices
    }

    pub fn microservice(&self, name: &str) -> Option<&Microservice> {
        self.microservices.iter().find(|m| m.name == name)
    }

    pub fn edges(&self) -> &[AppEdge] {
        &self.edges
    }

    pub fn loops(&self) -> &[AppLoop] {
        &self.loops
    }

    /// CPU demand of one instance of `name`, zero if unknown.
    pub fn mips_of(&self, name: &str) -> u64 {
        self.microservice(name).map(|m| m.mips).unwrap_or(0)
    }

    /// Microservice → microservice edges.
    pub fn module_edges(&self) -> impl Iterator<Item = &AppEdge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Module)
    }

    /// Microservices that send UP into `microservice`. These are the services
    /// whose hosts must learn where `microservice` runs.
    pub fn client_services(&self, microservice: &str) -> Vec<&str> {
        self.module_edges()
            .filter(|e| e.destination == microservice && e.direction == Direction::Up)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Whether all placement dependencies of `microservice` are in `placed`:
    /// every UP-incoming source and every DOWN-outgoing destination.
    pub fn dependencies_placed(&self, microservice: &str, placed: &BTreeSet<String>) -> bool {
        self.module_edges().all(|e| {
            let down_missing = e.source == microservice
                && e.direction == Direction::Down
                && !placed.contains(&e.destination);
            let up_missing = e.destination == microservice
                && e.direction == Direction::Up
                && !placed.contains(&e.source);
            !down_missing && !up_missing
        })
    }

    /// Microservices not yet placed whose dependencies are, in declaration order.
    pub fn ready_to_place(&self, placed: &BTreeSet<String>) -> Vec<&str> {
        self.microservices
            .iter()
            .map(|m| m.name.as_str())
            .filter(|name| !placed.contains(*name) && self.dependencies_placed(name, placed))
            .collect()
    }

    /// Sensor edge for a sensor tuple type.
    pub fn sensor_edge(&self, sensor_type: &str) -> Option<&AppEdge> {
        self.edges
            .iter()
            .find(|e| e.kind == EdgeKind::Sensor && e.source == sensor_type)
    }

    /// Loops whose last element is `module`.
    pub fn loops_ending_at<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a AppLoop> {
        self.loops
            .iter()
            .filter(move |l| l.modules.last().map(String::as_str) == Some(module))
    }

    // ─── Message production ───

    /// Create the message a sensor emits into this application.
    pub fn sensor_message(
        &self,
        sensor_type: &str,
        id: MessageId,
        now: Duration,
    ) -> Option<Message> {
        let edge = self.sensor_edge(sensor_type)?;
        let mut message = Message::new(
            id,
            self.id.clone(),
            self.user,
            edge.tuple_type.clone(),
            Direction::Up,
            edge.source.clone(),
            edge.destination.clone(),
        );
        message.cpu_length = edge.cpu_length;
        message.nw_length = edge.nw_length;
        message.emitted_at = now;
        Some(message)
    }

    /// Messages produced by `module` after processing `input`.
    ///
    /// One candidate per outgoing edge; an edge emits only when the module has
    /// a selectivity for (input type, edge type) and it selects. Outputs carry
    /// the input's traversal ledger, pins and root emission time.
    pub fn resultant_messages<R: Rng + ?Sized>(
        &self,
        module: &str,
        input: &Message,
        rng: &mut R,
        mut next_id: impl FnMut() -> MessageId,
    ) -> Vec<Message> {
        let Some(microservice) = self.microservice(module) else {
            return Vec::new();
        };

        let mut outputs = Vec::new();
        for edge in self.edges.iter().filter(|e| e.source == module) {
            let Some(selectivity) = microservice.selectivity(&input.tuple_type, &edge.tuple_type)
            else {
                continue;
            };
            if !selectivity.selects(rng) {
                continue;
            }

            let direction = match edge.kind {
                EdgeKind::Actuator => Direction::Actuator,
                EdgeKind::Module | EdgeKind::Sensor => edge.direction,
            };
            let mut message = Message::new(
                next_id(),
                self.id.clone(),
                input.user,
                edge.tuple_type.clone(),
                direction,
                edge.source.clone(),
                edge.destination.clone(),
            );
            message.cpu_length = edge.cpu_length;
            message.nw_length = edge.nw_length;
            message.output_size = input.output_size;
            message.inherit_from(input);
            outputs.push(message);
        }
        outputs
    }
}
