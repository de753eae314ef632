//! Topology construction and validation.

use crate::topology::Adjacency;
use crate::{RoutingTable, Topology, TopologyError};
use fogmesh_types::{DeviceId, DeviceSpec, LinkKind};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

/// Builds a [`Topology`] from device declarations.
///
/// # Example
///
/// ```ignore
/// let topology = TopologyBuilder::new(devices)
///     .with_cluster_level("gw")
///     .with_cluster_latency(Duration::from_millis(2))
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    devices: Vec<DeviceSpec>,
    cluster_levels: Vec<String>,
    cluster_latency: Duration,
}

impl TopologyBuilder {
    pub fn new(devices: Vec<DeviceSpec>) -> Self {
        Self {
            devices,
            ..Default::default()
        }
    }

    /// Form clusters among devices of this level that share a parent.
    pub fn with_cluster_level(mut self, identifier: impl Into<String>) -> Self {
        self.cluster_levels.push(identifier.into());
        self
    }

    pub fn with_cluster_levels<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cluster_levels
            .extend(identifiers.into_iter().map(Into::into));
        self
    }

    /// Latency of every cluster link.
    pub fn with_cluster_latency(mut self, latency: Duration) -> Self {
        self.cluster_latency = latency;
        self
    }

    /// Validate the declarations and compute adjacency, clusters and routing.
    pub fn build(self) -> Result<Topology, TopologyError> {
        let index = self.validate()?;
        let mut adjacency = vec![Adjacency::default(); self.devices.len()];

        for device in &self.devices {
            if let Some(parent) = device.parent {
                adjacency[index[&parent]]
                    .children
                    .push((device.id, device.uplink_latency));
            }
        }

        for level in &self.cluster_levels {
            self.form_clusters(level, &index, &mut adjacency);
        }

        let devices = &self.devices;
        let routing = RoutingTable::compute(devices.iter().map(|d| d.id).collect(), |r, c| {
            let (from, to) = (&devices[r], &devices[c]);
            if from.parent == Some(to.id) {
                return Some(from.uplink_latency);
            }
            let adj = &adjacency[r];
            adj.children
                .iter()
                .chain(adj.cluster.iter())
                .find(|(id, _)| *id == to.id)
                .map(|(_, latency)| *latency)
        });

        check_routes(&self.devices, &index, &routing)?;

        info!(
            devices = self.devices.len(),
            cluster_levels = self.cluster_levels.len(),
            "Topology built"
        );

        Ok(Topology {
            devices: self.devices,
            index,
            adjacency,
            routing,
        })
    }

    fn validate(&self) -> Result<BTreeMap<DeviceId, usize>, TopologyError> {
        let mut index = BTreeMap::new();
        for (i, device) in self.devices.iter().enumerate() {
            if index.insert(device.id, i).is_some() {
                return Err(TopologyError::DuplicateDevice(device.id));
            }
            let valid = [LinkKind::Uplink, LinkKind::Downlink, LinkKind::Cluster]
                .into_iter()
                .map(|link| device.bandwidth(link))
                .all(|bw| bw.is_finite() && bw > 0.0);
            if !valid {
                return Err(TopologyError::InvalidBandwidth(device.id));
            }
        }

        for device in &self.devices {
            if let Some(parent) = device.parent {
                if !index.contains_key(&parent) {
                    return Err(TopologyError::UnknownParent {
                        device: device.id,
                        parent,
                    });
                }
            }
        }

        for device in &self.devices {
            let mut current = device.parent;
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if parent == device.id || steps > self.devices.len() {
                    return Err(TopologyError::ParentCycle(device.id));
                }
                current = self.devices[index[&parent]].parent;
            }
        }

        Ok(index)
    }

    /// Make devices of `level` with the same parent mutual cluster siblings.
    fn form_clusters(
        &self,
        level: &str,
        index: &BTreeMap<DeviceId, usize>,
        adjacency: &mut [Adjacency],
    ) {
        let mut by_parent: BTreeMap<Option<DeviceId>, Vec<DeviceId>> = BTreeMap::new();
        for device in self.devices.iter().filter(|d| d.matches_level(level)) {
            by_parent.entry(device.parent).or_default().push(device.id);
        }

        for (parent, members) in &by_parent {
            for member in members {
                let siblings = &mut adjacency[index[member]].cluster;
                for other in members.iter().filter(|o| *o != member) {
                    if !siblings.iter().any(|(id, _)| id == other) {
                        siblings.push((*other, self.cluster_latency));
                    }
                }
            }

            let parent_name = parent
                .map(|p| self.devices[index[&p]].name.as_str())
                .unwrap_or("<root>");
            let names: Vec<&str> = members
                .iter()
                .map(|m| self.devices[index[m]].name.as_str())
                .collect();
            info!(level, parent = parent_name, members = ?names, "Cluster formed");
        }

        debug!(level, clusters = by_parent.len(), "Cluster level processed");
    }
}

/// Every pair of devices under the same root must route to each other.
///
/// Separate trees share no link, so pairs across them are left unrouted and
/// surface as [`TopologyError::MissingRoute`] when queried.
fn check_routes(
    devices: &[DeviceSpec],
    index: &BTreeMap<DeviceId, usize>,
    routing: &RoutingTable,
) -> Result<(), TopologyError> {
    let mut trees: BTreeMap<DeviceId, Vec<DeviceId>> = BTreeMap::new();
    for device in devices {
        let mut root = device;
        while let Some(parent) = root.parent {
            root = &devices[index[&parent]];
        }
        trees.entry(root.id).or_default().push(device.id);
    }

    for members in trees.values() {
        for &from in members {
            for &to in members {
                if routing.next_hop(from, to).is_none() {
                    error!(from = %from, to = %to, "No route inside a connected tree");
                    return Err(TopologyError::MissingRoute { from, to });
                }
            }
        }
    }
    Ok(())
}
