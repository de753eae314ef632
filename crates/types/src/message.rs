//! The message (tuple) travelling between microservices.

use crate::{ActuatorId, AppId, DeviceId, Direction, InstanceId, MessageId, UserId};
use std::collections::BTreeMap;
use std::time::Duration;

/// A unit of application data flowing along an application edge.
///
/// A message carries a ledger of (device, microservice) pairs it was processed
/// at. Responses travelling DOWN use the ledger to find their way back to the
/// device that produced the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub app_id: AppId,
    pub user: UserId,
    pub tuple_type: String,
    pub direction: Direction,
    pub src_module: String,
    pub dest_module: String,
    /// Processing demand in MI.
    pub cpu_length: u64,
    /// Network size in bytes.
    pub nw_length: u64,
    pub output_size: u64,
    /// Device that emitted this message onto the network.
    pub source_device: Option<DeviceId>,
    /// Resolved destination device. `None` until dispatch selects one.
    pub destination_device: Option<DeviceId>,
    /// Set for messages addressed to an actuator.
    pub actuator: Option<ActuatorId>,
    /// Id of the sensor message this message descends from.
    pub root: MessageId,
    /// Emission time of the root sensor message.
    pub emitted_at: Duration,
    traversed: Vec<(DeviceId, String)>,
    pins: BTreeMap<String, InstanceId>,
}

impl Message {
    pub fn new(
        id: MessageId,
        app_id: AppId,
        user: UserId,
        tuple_type: impl Into<String>,
        direction: Direction,
        src_module: impl Into<String>,
        dest_module: impl Into<String>,
    ) -> Self {
        Self {
            id,
            app_id,
            user,
            tuple_type: tuple_type.into(),
            direction,
            src_module: src_module.into(),
            dest_module: dest_module.into(),
            cpu_length: 0,
            nw_length: 0,
            output_size: 0,
            source_device: None,
            destination_device: None,
            actuator: None,
            root: id,
            emitted_at: Duration::ZERO,
            traversed: Vec::new(),
            pins: BTreeMap::new(),
        }
    }

    /// Record that `microservice` processed this message on `device`.
    pub fn record_traversal(&mut self, device: DeviceId, microservice: impl Into<String>) {
        self.traversed.push((device, microservice.into()));
    }

    /// Most recent device that processed `microservice` for this message chain.
    pub fn device_for_microservice(&self, microservice: &str) -> Option<DeviceId> {
        self.traversed
            .iter()
            .rev()
            .find(|(_, ms)| ms == microservice)
            .map(|(device, _)| *device)
    }

    pub fn traversed(&self) -> &[(DeviceId, String)] {
        &self.traversed
    }

    /// Instance pinned for `microservice`, if any.
    pub fn pin(&self, microservice: &str) -> Option<InstanceId> {
        self.pins.get(microservice).copied()
    }

    pub fn set_pin(&mut self, microservice: impl Into<String>, instance: InstanceId) {
        self.pins.insert(microservice.into(), instance);
    }

    /// Copy the ledger, pins and root information of `parent`.
    pub fn inherit_from(&mut self, parent: &Message) {
        self.traversed = parent.traversed.clone();
        self.pins = parent.pins.clone();
        self.root = parent.root;
        self.emitted_at = parent.emitted_at;
    }

    /// Network size used for transmission delay and usage accounting.
    pub fn size_bytes(&self) -> u64 {
        self.nw_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message::new(
            MessageId(1),
            AppId::new("app"),
            UserId(0),
            "RAW",
            Direction::Up,
            "client",
            "a",
        )
    }

    #[test]
    fn test_device_for_microservice_returns_latest() {
        let mut m = message();
        m.record_traversal(DeviceId(1), "a");
        m.record_traversal(DeviceId(2), "b");
        m.record_traversal(DeviceId(3), "a");
        assert_eq!(m.device_for_microservice("a"), Some(DeviceId(3)));
        assert_eq!(m.device_for_microservice("b"), Some(DeviceId(2)));
        assert_eq!(m.device_for_microservice("c"), None);
    }

    #[test]
    fn test_inherit_from_copies_ledger_and_pins() {
        let mut parent = message();
        parent.record_traversal(DeviceId(4), "client");
        parent.set_pin("a", InstanceId::new(DeviceId(5), 0));
        parent.emitted_at = Duration::from_secs(2);

        let mut child = Message::new(
            MessageId(2),
            parent.app_id.clone(),
            parent.user,
            "FILTERED",
            Direction::Up,
            "a",
            "b",
        );
        child.inherit_from(&parent);

        assert_eq!(child.root, MessageId(1));
        assert_eq!(child.emitted_at, Duration::from_secs(2));
        assert_eq!(child.device_for_microservice("client"), Some(DeviceId(4)));
        assert_eq!(child.pin("a"), Some(InstanceId::new(DeviceId(5), 0)));
    }
}
