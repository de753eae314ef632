//! Timer identification.
//!
//! The state machine emits `Action::SetTimer`; the simulation runner turns
//! each timer into an event on its deterministic queue.

use fogmesh_types::LinkKind;

/// Timer identification for scheduled events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Periodic placement cycle of an orchestrating device.
    PlacementCycle,
    /// Transmission on the given outbound link has finished.
    LinkFree(LinkKind),
}
