//! Event types for the deterministic device state machines.

use fogmesh_types::{AppId, DeviceId, LinkKind, Message, PlacementRequest};

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same simulation time are processed in priority order.
/// Lower values = higher priority (processed first).
///
/// Internal events (consequences of processing an event) are handled before
/// new external inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Internal events: consequences of prior event processing.
    Internal = 0,

    /// Timer events: scheduled by the device itself.
    Timer = 1,

    /// Network events: messages arriving over a link.
    Network = 2,

    /// Client events: sensor emissions entering the system. Only the runner
    /// schedules these.
    Client = 3,
}

/// All possible events a device can receive.
///
/// Events are **passive data** - they describe something that happened.
/// The state machine processes events and returns actions.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// Time to run the placement algorithm over the pending request queue.
    PlacementTimer,

    /// The transmission occupying `link` has finished.
    LinkFreed { link: LinkKind },

    // ═══════════════════════════════════════════════════════════════════════
    // Network (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// An application message arrived at this device, either over a link or
    /// as a resultant of local execution.
    MessageArrived { message: Box<Message> },

    // ═══════════════════════════════════════════════════════════════════════
    // Control plane (priority: Internal)
    // Delivered with zero delay between devices.
    // ═══════════════════════════════════════════════════════════════════════
    /// A placement request was submitted to this orchestrator.
    PlacementRequestSubmitted { request: PlacementRequest },

    /// `microservice` is now hosted on `device`.
    ServiceDiscoveryUpdate {
        microservice: String,
        device: DeviceId,
    },

    /// Mark an application active on this device.
    ActivateApplication { app_id: AppId },

    /// The application is ready to receive instances on this device.
    ApplicationReady { app_id: AppId },

    /// Launch one instance of `microservice` on this device.
    LaunchMicroservice { app_id: AppId, microservice: String },
}

impl Event {
    /// Get the priority for this event type.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::PlacementTimer | Event::LinkFreed { .. } => EventPriority::Timer,

            Event::MessageArrived { .. } => EventPriority::Network,

            Event::PlacementRequestSubmitted { .. }
            | Event::ServiceDiscoveryUpdate { .. }
            | Event::ActivateApplication { .. }
            | Event::ApplicationReady { .. }
            | Event::LaunchMicroservice { .. } => EventPriority::Internal,
        }
    }

    /// Check if this is an internal event (consequence of prior processing).
    pub fn is_internal(&self) -> bool {
        self.priority() == EventPriority::Internal
    }

    /// Check if this is a network event.
    pub fn is_network(&self) -> bool {
        self.priority() == EventPriority::Network
    }

    /// Get the event type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::PlacementTimer => "PlacementTimer",
            Event::LinkFreed { .. } => "LinkFreed",
            Event::MessageArrived { .. } => "MessageArrived",
            Event::PlacementRequestSubmitted { .. } => "PlacementRequestSubmitted",
            Event::ServiceDiscoveryUpdate { .. } => "ServiceDiscoveryUpdate",
            Event::ActivateApplication { .. } => "ActivateApplication",
            Event::ApplicationReady { .. } => "ApplicationReady",
            Event::LaunchMicroservice { .. } => "LaunchMicroservice",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogmesh_types::{Direction, MessageId, RequestId, UserId};

    #[test]
    fn test_priorities() {
        let msg = Message::new(
            MessageId(1),
            AppId::new("a"),
            UserId(0),
            "T",
            Direction::Up,
            "x",
            "y",
        );
        assert_eq!(
            Event::MessageArrived {
                message: Box::new(msg)
            }
            .priority(),
            EventPriority::Network
        );
        assert_eq!(Event::PlacementTimer.priority(), EventPriority::Timer);
        assert!(Event::PlacementRequestSubmitted {
            request: PlacementRequest::new(RequestId(1), AppId::new("a"), DeviceId(1)),
        }
        .is_internal());
    }

    #[test]
    fn test_priority_order() {
        assert!(EventPriority::Internal < EventPriority::Timer);
        assert!(EventPriority::Timer < EventPriority::Network);
        assert!(EventPriority::Network < EventPriority::Client);
    }
}
