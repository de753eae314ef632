//! Microservice placement.
//!
//! An orchestrator hands a batch of [`PlacementRequest`]s to a
//! [`PlacementAlgorithm`] together with a [`PlacementContext`] describing its
//! domain. The algorithm answers with a [`PlacementMap`]; `post_processing`
//! then commits the placed CPU load to the domain's [`ResourceSnapshot`].
//!
//! [`PlacementRequest`]: fogmesh_types::PlacementRequest
//! [`PlacementMap`]: fogmesh_types::PlacementMap

mod edgeward;
mod error;
mod snapshot;
mod strategy;

pub use edgeward::EdgewardPlacement;
pub use error::ShiftError;
pub use snapshot::ResourceSnapshot;
pub use strategy::{PlacementAlgorithm, PlacementContext, PlacementStrategy};
