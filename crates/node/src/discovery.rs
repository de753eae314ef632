//! Service discovery directory.

use fogmesh_types::DeviceId;
use std::collections::BTreeMap;

/// Microservice name → devices hosting it, as learned from placement.
///
/// Entries are appended on every propagation, so a device announced twice
/// appears twice and is chosen twice as often by round robin.
#[derive(Debug, Clone, Default)]
pub struct ServiceDirectory {
    entries: BTreeMap<String, Vec<DeviceId>>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, microservice: impl Into<String>, device: DeviceId) {
        self.entries.entry(microservice.into()).or_default().push(device);
    }

    /// Hosts of `microservice` in announcement order.
    pub fn hosts(&self, microservice: &str) -> &[DeviceId] {
        self.entries
            .get(microservice)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_kept() {
        let mut directory = ServiceDirectory::new();
        directory.add("svc", DeviceId(1));
        directory.add("svc", DeviceId(2));
        directory.add("svc", DeviceId(1));
        assert_eq!(directory.hosts("svc"), &[DeviceId(1), DeviceId(2), DeviceId(1)]);
        assert!(directory.hosts("other").is_empty());
    }
}
