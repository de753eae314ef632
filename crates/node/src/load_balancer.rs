//! Destination selection among the hosts of a microservice.

use crate::ServiceDirectory;
use fogmesh_types::DeviceId;
use std::collections::HashMap;

/// Picks one hosting device for a microservice.
pub trait LoadBalancer: Send {
    fn select(&mut self, microservice: &str, directory: &ServiceDirectory) -> Option<DeviceId>;
}

/// Round robin over the directory entries of each microservice.
///
/// Repeated entries in the directory give a host proportionally more turns.
#[derive(Debug, Clone, Default)]
pub struct WeightedRoundRobin {
    positions: HashMap<String, usize>,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn select(&mut self, microservice: &str, directory: &ServiceDirectory) -> Option<DeviceId> {
        let hosts = directory.hosts(microservice);
        if hosts.is_empty() {
            return None;
        }
        let position = match self.positions.get(microservice) {
            None => 0,
            Some(&last) if last + 1 >= hosts.len() => 0,
            Some(&last) => last + 1,
        };
        self.positions.insert(microservice.to_owned(), position);
        Some(hosts[position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternates_between_two_hosts() {
        let mut directory = ServiceDirectory::new();
        directory.add("svc", DeviceId(1));
        directory.add("svc", DeviceId(2));

        let mut balancer = WeightedRoundRobin::new();
        let picks: Vec<_> = (0..3)
            .map(|_| balancer.select("svc", &directory).unwrap())
            .collect();
        assert_eq!(picks, vec![DeviceId(1), DeviceId(2), DeviceId(1)]);
    }

    #[test]
    fn test_repeated_entry_weights_selection() {
        let mut directory = ServiceDirectory::new();
        directory.add("svc", DeviceId(1));
        directory.add("svc", DeviceId(1));
        directory.add("svc", DeviceId(2));

        let mut balancer = WeightedRoundRobin::new();
        let picks: Vec<_> = (0..6)
            .map(|_| balancer.select("svc", &directory).unwrap())
            .collect();
        assert_eq!(picks.iter().filter(|d| **d == DeviceId(1)).count(), 4);
    }

    #[test]
    fn test_unknown_microservice() {
        let mut balancer = WeightedRoundRobin::new();
        assert_eq!(balancer.select("svc", &ServiceDirectory::new()), None);
    }

    #[test]
    fn test_position_wraps_when_directory_shrinks_view() {
        let mut directory = ServiceDirectory::new();
        directory.add("svc", DeviceId(1));
        let mut balancer = WeightedRoundRobin::new();
        assert_eq!(balancer.select("svc", &directory), Some(DeviceId(1)));
        assert_eq!(balancer.select("svc", &directory), Some(DeviceId(1)));
        directory.add("svc", DeviceId(2));
        assert_eq!(balancer.select("svc", &directory), Some(DeviceId(2)));
    }
}
