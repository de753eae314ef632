//! Built topology and its derived queries.

use crate::{RoutingTable, TopologyError};
use fogmesh_types::{DeviceId, DeviceSpec, LinkKind};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

/// How one device reaches an adjacent device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub kind: LinkKind,
    pub latency: Duration,
}

/// Per-device adjacency derived at build time.
#[derive(Debug, Clone, Default)]
pub(crate) struct Adjacency {
    /// Children in declaration order, with the child's uplink latency.
    pub children: Vec<(DeviceId, Duration)>,
    /// Cluster siblings in declaration order.
    pub cluster: Vec<(DeviceId, Duration)>,
}

/// The static device graph.
///
/// Built once by [`TopologyBuilder`](crate::TopologyBuilder); every query is
/// read-only.
#[derive(Debug, Clone)]
pub struct Topology {
    pub(crate) devices: Vec<DeviceSpec>,
    pub(crate) index: BTreeMap<DeviceId, usize>,
    pub(crate) adjacency: Vec<Adjacency>,
    pub(crate) routing: RoutingTable,
}

impl Topology {
    // ─── Devices ───

    /// All devices in declaration order.
    pub fn devices(&self) -> &[DeviceSpec] {
        &self.devices
    }

    pub fn device(&self, id: DeviceId) -> Option<&DeviceSpec> {
        self.index.get(&id).map(|&i| &self.devices[i])
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn parent(&self, id: DeviceId) -> Option<DeviceId> {
        self.device(id).and_then(|d| d.parent)
    }

    /// Children of `id` in declaration order.
    pub fn children(&self, id: DeviceId) -> impl Iterator<Item = DeviceId> + '_ {
        self.adjacency_of(id)
            .into_iter()
            .flat_map(|a| a.children.iter().map(|(c, _)| *c))
    }

    /// Cluster siblings of `id` in declaration order.
    pub fn cluster_siblings(&self, id: DeviceId) -> impl Iterator<Item = DeviceId> + '_ {
        self.adjacency_of(id)
            .into_iter()
            .flat_map(|a| a.cluster.iter().map(|(s, _)| *s))
    }

    pub fn is_in_cluster(&self, id: DeviceId) -> bool {
        self.adjacency_of(id).is_some_and(|a| !a.cluster.is_empty())
    }

    /// Link from `from` to the adjacent device `to`.
    ///
    /// The parent wins over a child, which wins over a cluster sibling.
    pub fn link(&self, from: DeviceId, to: DeviceId) -> Option<Link> {
        let spec = self.device(from)?;
        if spec.parent == Some(to) {
            return Some(Link {
                kind: LinkKind::Uplink,
                latency: spec.uplink_latency,
            });
        }
        let adjacency = self.adjacency_of(from)?;
        if let Some((_, latency)) = adjacency.children.iter().find(|(c, _)| *c == to) {
            return Some(Link {
                kind: LinkKind::Downlink,
                latency: *latency,
            });
        }
        adjacency
            .cluster
            .iter()
            .find(|(s, _)| *s == to)
            .map(|(_, latency)| Link {
                kind: LinkKind::Cluster,
                latency: *latency,
            })
    }

    // ─── Routing ───

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Next hop from `from` towards `to`.
    pub fn next_hop(&self, from: DeviceId, to: DeviceId) -> Result<DeviceId, TopologyError> {
        self.routing
            .next_hop(from, to)
            .ok_or(TopologyError::MissingRoute { from, to })
    }

    /// Shortest total latency between two devices.
    pub fn distance(&self, from: DeviceId, to: DeviceId) -> Option<Duration> {
        self.routing.distance(from, to)
    }

    /// Devices visited when following next hops from `from` to `to`, both
    /// ends included.
    pub fn path(&self, from: DeviceId, to: DeviceId) -> Result<Vec<DeviceId>, TopologyError> {
        let mut path = vec![from];
        let mut current = from;
        while current != to {
            let next = self.next_hop(current, to)?;
            if path.len() > self.devices.len() {
                return Err(TopologyError::MissingRoute { from, to });
            }
            path.push(next);
            current = next;
        }
        Ok(path)
    }

    // ─── Orchestration ───

    /// Nearest orchestrating ancestor of `id`, including `id` itself.
    pub fn orchestrator_for(&self, id: DeviceId) -> Option<DeviceId> {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(device) = current.and_then(|c| self.device(c)) {
            if device.role.is_orchestrator() {
                return Some(device.id);
            }
            steps += 1;
            if steps > self.devices.len() {
                return None;
            }
            current = device.parent;
        }
        None
    }

    /// Devices reachable from `root` over child and cluster links, root first.
    pub fn domain(&self, root: DeviceId) -> Vec<DeviceId> {
        if !self.contains(root) {
            return Vec::new();
        }
        let mut seen = BTreeSet::from([root]);
        let mut order = vec![root];
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            let neighbours: Vec<DeviceId> = self
                .children(current)
                .chain(self.cluster_siblings(current))
                .collect();
            for next in neighbours {
                if seen.insert(next) {
                    order.push(next);
                    queue.push_back(next);
                }
            }
        }
        order
    }

    /// Every path from a leaf below `root` up to `root`, leaf first.
    ///
    /// Children are visited in declaration order.
    pub fn leaf_to_root_paths(&self, root: DeviceId) -> Vec<Vec<DeviceId>> {
        if !self.contains(root) {
            return Vec::new();
        }
        let mut paths = Vec::new();
        // (device, path from root down to device)
        let mut stack = vec![(root, vec![root])];
        while let Some((device, down)) = stack.pop() {
            let children: Vec<DeviceId> = self.children(device).collect();
            if children.is_empty() {
                let mut up = down;
                up.reverse();
                paths.push(up);
                continue;
            }
            // Reverse so the first child is expanded first.
            for child in children.into_iter().rev() {
                if down.contains(&child) {
                    continue;
                }
                let mut next = down.clone();
                next.push(child);
                stack.push((child, next));
            }
        }
        paths
    }

    fn adjacency_of(&self, id: DeviceId) -> Option<&Adjacency> {
        self.index.get(&id).map(|&i| &self.adjacency[i])
    }
}
