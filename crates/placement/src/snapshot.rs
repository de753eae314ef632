//! Free resources of an orchestration domain.

use fogmesh_types::{DeviceId, Resources};
use std::collections::BTreeMap;

/// Remaining resources per device, as seen by one orchestrator.
///
/// Initialized from device capacities and reduced permanently after every
/// placement cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSnapshot {
    remaining: BTreeMap<DeviceId, Resources>,
}

impl ResourceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, id: DeviceId, capacity: Resources) -> Self {
        self.insert(id, capacity);
        self
    }

    pub fn insert(&mut self, id: DeviceId, capacity: Resources) {
        self.remaining.insert(id, capacity);
    }

    pub fn get(&self, id: DeviceId) -> Option<&Resources> {
        self.remaining.get(&id)
    }

    /// Free CPU of `id`, zero for unknown devices.
    pub fn free_cpu(&self, id: DeviceId) -> u64 {
        self.remaining.get(&id).map(|r| r.cpu_mips).unwrap_or(0)
    }

    /// Deduct `mips` from the free CPU of `id`.
    pub fn consume_cpu(&mut self, id: DeviceId, mips: u64) {
        if let Some(r) = self.remaining.get_mut(&id) {
            r.cpu_mips = r.cpu_mips.saturating_sub(mips);
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.remaining.keys().copied()
    }
}

impl FromIterator<(DeviceId, Resources)> for ResourceSnapshot {
    fn from_iter<T: IntoIterator<Item = (DeviceId, Resources)>>(iter: T) -> Self {
        Self {
            remaining: iter.into_iter().collect(),
        }
    }
}
