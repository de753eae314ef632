//! All-pairs next-hop routing by iterative relaxation.

use fogmesh_types::DeviceId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Shortest-latency next hops between every pair of devices.
///
/// Indexed by device declaration order. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    ids: Vec<DeviceId>,
    index: BTreeMap<DeviceId, usize>,
    distance: Vec<Vec<Option<Duration>>>,
    next_hop: Vec<Vec<Option<usize>>>,
}

impl RoutingTable {
    /// Compute routing over `ids` given a direct-link latency function.
    ///
    /// `direct(row, column)` returns the latency of the link between the
    /// devices at those indices, or `None` if they are not adjacent.
    ///
    /// The first sweep records direct links (symmetrically). Every sweep then
    /// fills unknown distances through an intermediate device and strictly
    /// improves known positive ones, until a sweep changes nothing. The
    /// lowest-index intermediate achieving a strictly lower total wins.
    pub(crate) fn compute<F>(ids: Vec<DeviceId>, direct: F) -> Self
    where
        F: Fn(usize, usize) -> Option<Duration>,
    {
        let size = ids.len();
        let mut distance = vec![vec![None; size]; size];
        let mut next_hop: Vec<Vec<Option<usize>>> = vec![vec![None; size]; size];

        let mut first_sweep = true;
        let mut changed = true;
        let mut sweeps = 0usize;
        while changed || first_sweep {
            changed = false;
            for row in 0..size {
                for column in 0..size {
                    let mut dist = distance[row][column];

                    if first_sweep && dist.is_none() {
                        dist = if row == column {
                            Some(Duration::ZERO)
                        } else {
                            direct(row, column)
                        };
                        if let Some(d) = dist {
                            changed = true;
                            distance[row][column] = Some(d);
                            distance[column][row] = Some(d);
                            next_hop[row][column] = Some(column);
                            next_hop[column][row] = Some(row);
                        }
                    }

                    if dist.is_none() {
                        if let Some((total, mid)) = best_intermediate(row, column, &distance) {
                            changed = true;
                            distance[row][column] = Some(total);
                            next_hop[row][column] = next_hop[row][mid];
                            dist = Some(total);
                        }
                    }

                    if let Some(current) = dist.filter(|d| !d.is_zero()) {
                        if let Some((total, mid)) = best_intermediate(row, column, &distance) {
                            if total < current {
                                changed = true;
                                distance[row][column] = Some(total);
                                next_hop[row][column] = next_hop[row][mid];
                            }
                        }
                    }
                }
            }
            first_sweep = false;
            sweeps += 1;
        }

        tracing::debug!(devices = size, sweeps, "Routing tables computed");

        let index = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self {
            ids,
            index,
            distance,
            next_hop,
        }
    }

    /// Next hop from `from` towards `to`. `next_hop(x, x)` is `x`.
    pub fn next_hop(&self, from: DeviceId, to: DeviceId) -> Option<DeviceId> {
        let (row, column) = self.indices(from, to)?;
        self.next_hop[row][column].map(|i| self.ids[i])
    }

    /// Shortest total latency from `from` to `to`.
    pub fn distance(&self, from: DeviceId, to: DeviceId) -> Option<Duration> {
        let (row, column) = self.indices(from, to)?;
        self.distance[row][column]
    }

    /// Routing table of one device: destination → next hop.
    pub fn routes_from(&self, from: DeviceId) -> BTreeMap<DeviceId, DeviceId> {
        let Some(&row) = self.index.get(&from) else {
            return BTreeMap::new();
        };
        self.next_hop[row]
            .iter()
            .enumerate()
            .filter_map(|(column, hop)| hop.map(|h| (self.ids[column], self.ids[h])))
            .collect()
    }

    fn indices(&self, from: DeviceId, to: DeviceId) -> Option<(usize, usize)> {
        Some((*self.index.get(&from)?, *self.index.get(&to)?))
    }
}

/// Cheapest route from `row` to `dest` through a single intermediate, if it
/// beats the currently known distance (or if none is known).
fn best_intermediate(
    row: usize,
    dest: usize,
    distance: &[Vec<Option<Duration>>],
) -> Option<(Duration, usize)> {
    let mut best = distance[row][dest];
    let mut mid = None;
    for (column, through) in distance[row].iter().enumerate() {
        let (Some(first), Some(second)) = (through, distance[column][dest]) else {
            continue;
        };
        let total = *first + second;
        match best {
            Some(b) if total >= b => {}
            _ => {
                best = Some(total);
                mid = Some(column);
            }
        }
    }
    mid.zip(best).map(|(m, b)| (b, m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// 0 - 1 - 2 chain plus a slow direct 0 - 2 link.
    fn triangle() -> RoutingTable {
        let ids = vec![DeviceId(10), DeviceId(11), DeviceId(12)];
        RoutingTable::compute(ids, |a, b| match (a.min(b), a.max(b)) {
            (0, 1) => Some(ms(2)),
            (1, 2) => Some(ms(3)),
            (0, 2) => Some(ms(100)),
            _ => None,
        })
    }

    #[test]
    fn test_self_route() {
        let table = triangle();
        assert_eq!(table.next_hop(DeviceId(11), DeviceId(11)), Some(DeviceId(11)));
        assert_eq!(table.distance(DeviceId(11), DeviceId(11)), Some(Duration::ZERO));
    }

    #[test]
    fn test_indirect_beats_slow_direct_link() {
        let table = triangle();
        assert_eq!(table.next_hop(DeviceId(10), DeviceId(12)), Some(DeviceId(11)));
        assert_eq!(table.distance(DeviceId(10), DeviceId(12)), Some(ms(5)));
        assert_eq!(table.next_hop(DeviceId(12), DeviceId(10)), Some(DeviceId(11)));
    }

    #[test]
    fn test_unknown_device_has_no_route() {
        let table = triangle();
        assert_eq!(table.next_hop(DeviceId(10), DeviceId(99)), None);
        assert!(table.routes_from(DeviceId(99)).is_empty());
    }

    #[test]
    fn test_disconnected_devices_have_no_route() {
        let ids = vec![DeviceId(1), DeviceId(2)];
        let table = RoutingTable::compute(ids, |_, _| None);
        assert_eq!(table.next_hop(DeviceId(1), DeviceId(2)), None);
        assert_eq!(table.routes_from(DeviceId(1)).len(), 1);
    }

    #[test]
    fn test_lowest_index_intermediate_wins_ties() {
        // 0 connects to 3 through either 1 or 2 with equal cost.
        let ids = (0..4).map(DeviceId).collect();
        let table = RoutingTable::compute(ids, |a, b| match (a.min(b), a.max(b)) {
            (0, 1) | (0, 2) | (1, 3) | (2, 3) => Some(ms(1)),
            _ => None,
        });
        assert_eq!(table.next_hop(DeviceId(0), DeviceId(3)), Some(DeviceId(1)));
    }
}
