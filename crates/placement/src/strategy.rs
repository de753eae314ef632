//! Placement algorithm contract and strategy selection.

use crate::{EdgewardPlacement, ResourceSnapshot};
use fogmesh_topology::Topology;
use fogmesh_types::{Applications, ConfigError, DeviceId, PlacementMap, PlacementRequest};
use std::fmt;
use std::str::FromStr;

/// Everything an algorithm may look at while placing one batch.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    pub topology: &'a Topology,
    /// Orchestrating device.
    pub root: DeviceId,
    /// Devices the orchestrator may place on, root first.
    pub domain: &'a [DeviceId],
    pub applications: &'a Applications,
    /// Free resources of the domain at the start of the cycle.
    pub resources: &'a ResourceSnapshot,
}

/// A pluggable placement strategy.
///
/// Called once per placement cycle: `run` computes assignments using
/// transient bookkeeping, then `post_processing` commits the placed load to
/// the snapshot and clears that bookkeeping.
pub trait PlacementAlgorithm: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Place as many of `requests` as possible.
    ///
    /// Only requests whose every unplaced microservice received a device
    /// appear in the result; the others must stay queued.
    fn run(&mut self, ctx: &PlacementContext<'_>, requests: &[PlacementRequest]) -> PlacementMap;

    /// Deduct the CPU placed by the last `run` from `resources` and reset.
    fn post_processing(&mut self, resources: &mut ResourceSnapshot);
}

/// Available placement algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementStrategy {
    /// Place as close to the edge as capacity allows.
    #[default]
    Edgeward,
}

impl PlacementStrategy {
    /// Instantiate the algorithm for the orchestrator at `root`.
    pub fn build(self, root: DeviceId) -> Box<dyn PlacementAlgorithm> {
        match self {
            PlacementStrategy::Edgeward => Box::new(EdgewardPlacement::new(root)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlacementStrategy::Edgeward => "edgeward",
        }
    }
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlacementStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "edgeward" => Ok(PlacementStrategy::Edgeward),
            _ => Err(ConfigError::UnknownStrategy(s.to_owned())),
        }
    }
}
