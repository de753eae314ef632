//! Sensors and actuators attached to devices.

use fogmesh_types::{ActuatorId, AppId, DeviceId, SensorId};
use std::time::Duration;

/// A periodic message source feeding an application through its gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSpec {
    pub id: SensorId,
    /// Device the sensor is attached to; also hosts the client module.
    pub gateway: DeviceId,
    pub app_id: AppId,
    /// Tuple type emitted, matching a sensor edge of the application.
    pub tuple_type: String,
    /// Time between two emissions; the first happens one interval in.
    pub interval: Duration,
    /// Latency between the sensor and its gateway.
    pub latency: Duration,
}

impl SensorSpec {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(6);

    pub fn new(
        id: SensorId,
        gateway: DeviceId,
        app_id: impl Into<AppId>,
        tuple_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            gateway,
            app_id: app_id.into(),
            tuple_type: tuple_type.into(),
            interval: Self::DEFAULT_INTERVAL,
            latency: Self::DEFAULT_LATENCY,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// A sink for ACTUATOR messages, closing application loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorSpec {
    pub id: ActuatorId,
    pub device: DeviceId,
    pub app_id: AppId,
    pub actuator_type: String,
    pub latency: Duration,
}

impl ActuatorSpec {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1);

    pub fn new(
        id: ActuatorId,
        device: DeviceId,
        app_id: impl Into<AppId>,
        actuator_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            device,
            app_id: app_id.into(),
            actuator_type: actuator_type.into(),
            latency: Self::DEFAULT_LATENCY,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}
