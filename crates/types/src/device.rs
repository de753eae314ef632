//! Device descriptors.

use crate::{ConfigError, DeviceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Role of a device in the fog hierarchy.
///
/// - `Client`: ingress device; hosts only the application's client module and is
///   never used for shared microservices.
/// - `Fcn`: fog computation node; hosts instances, does not orchestrate.
/// - `Fon`: fog orchestration node; runs the placement orchestrator for its subtree.
/// - `Cloud`: cloud datacenter; orchestrates like a FON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    Client,
    Fcn,
    Fon,
    Cloud,
}

impl DeviceRole {
    /// Whether this role runs a placement orchestrator.
    pub fn is_orchestrator(self) -> bool {
        match self {
            DeviceRole::Fon | DeviceRole::Cloud => true,
            DeviceRole::Client | DeviceRole::Fcn => false,
        }
    }

    /// Whether placement may put shared microservices on this role.
    pub fn hosts_shared_microservices(self) -> bool {
        match self {
            DeviceRole::Client => false,
            DeviceRole::Fcn | DeviceRole::Fon | DeviceRole::Cloud => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceRole::Client => "client",
            DeviceRole::Fcn => "fcn",
            DeviceRole::Fon => "fon",
            DeviceRole::Cloud => "cloud",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(DeviceRole::Client),
            "fcn" => Ok(DeviceRole::Fcn),
            "fon" => Ok(DeviceRole::Fon),
            "cloud" => Ok(DeviceRole::Cloud),
            _ => Err(ConfigError::UnknownRole(s.to_owned())),
        }
    }
}

/// Outbound link classes of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkKind {
    /// Link towards the parent.
    Uplink,
    /// Shared link towards the children.
    Downlink,
    /// Dedicated link towards the cluster siblings.
    Cluster,
}

/// Resource capacity (or remaining availability) of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    /// Processing capacity in MIPS.
    pub cpu_mips: u64,
    /// Memory in MB.
    pub ram_mb: u64,
    /// Storage in MB.
    pub storage_mb: u64,
}

impl Resources {
    pub fn new(cpu_mips: u64, ram_mb: u64, storage_mb: u64) -> Self {
        Self {
            cpu_mips,
            ram_mb,
            storage_mb,
        }
    }

    /// CPU-only capacity, with RAM and storage left at zero.
    pub fn cpu(cpu_mips: u64) -> Self {
        Self {
            cpu_mips,
            ..Default::default()
        }
    }
}

/// Static description of a device, as declared before topology setup.
///
/// Children and cluster siblings are not declared here; the topology builder
/// derives them from parent declarations and cluster level identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    pub id: DeviceId,
    pub name: String,
    pub role: DeviceRole,
    /// Parent device, `None` for the root.
    pub parent: Option<DeviceId>,
    /// Optional cluster level label. Devices also match a level when their name
    /// starts with the level identifier.
    pub level: Option<String>,
    pub capacity: Resources,
    /// Latency of the link to the parent.
    pub uplink_latency: Duration,
    /// Uplink bandwidth in bytes per second.
    pub uplink_bandwidth: f64,
    /// Downlink bandwidth in bytes per second.
    pub downlink_bandwidth: f64,
    /// Cluster link bandwidth in bytes per second.
    pub cluster_bandwidth: f64,
}

impl DeviceSpec {
    /// Default bandwidth for all link classes (bytes per second).
    pub const DEFAULT_BANDWIDTH: f64 = 10_000_000.0;

    /// Create a root device (no parent) with default bandwidths.
    pub fn new(id: DeviceId, name: impl Into<String>, role: DeviceRole, capacity: Resources) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            parent: None,
            level: None,
            capacity,
            uplink_latency: Duration::ZERO,
            uplink_bandwidth: Self::DEFAULT_BANDWIDTH,
            downlink_bandwidth: Self::DEFAULT_BANDWIDTH,
            cluster_bandwidth: Self::DEFAULT_BANDWIDTH,
        }
    }

    /// Attach this device below `parent` with the given uplink latency.
    pub fn with_parent(mut self, parent: DeviceId, uplink_latency: Duration) -> Self {
        self.parent = Some(parent);
        self.uplink_latency = uplink_latency;
        self
    }

    /// Set the cluster level label.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Set uplink, downlink and cluster bandwidths (bytes per second).
    pub fn with_bandwidths(mut self, uplink: f64, downlink: f64, cluster: f64) -> Self {
        self.uplink_bandwidth = uplink;
        self.downlink_bandwidth = downlink;
        self.cluster_bandwidth = cluster;
        self
    }

    /// Whether this device belongs to the cluster level `identifier`.
    pub fn matches_level(&self, identifier: &str) -> bool {
        match &self.level {
            Some(level) => level == identifier,
            None => self.name.starts_with(identifier),
        }
    }

    /// Bandwidth of the given outbound link class.
    pub fn bandwidth(&self, link: LinkKind) -> f64 {
        match link {
            LinkKind::Uplink => self.uplink_bandwidth,
            LinkKind::Downlink => self.downlink_bandwidth,
            LinkKind::Cluster => self.cluster_bandwidth,
        }
    }
}
