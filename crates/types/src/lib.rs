//! Core types for fogmesh.
//!
//! This crate provides the foundational types used throughout the placement
//! and routing implementation:
//!
//! - **Identifiers**: DeviceId, InstanceId, MessageId, RequestId, etc.
//! - **Devices**: DeviceRole, DeviceSpec, Resources
//! - **Application model**: Application, Microservice, AppEdge, AppLoop
//! - **Messages**: Message (the tuple travelling between microservices)
//! - **Placement**: PlacementRequest, PlacementSlot, PlacementMap
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend on
//! any other workspace crates, making it the foundation layer.

mod application;
mod device;
mod error;
mod identifiers;
mod message;
mod placement;

pub use application::{
    AppEdge, AppLoop, Application, Applications, Direction, EdgeKind, Microservice, Selectivity,
};
pub use device::{DeviceRole, DeviceSpec, LinkKind, Resources};
pub use error::ConfigError;
pub use identifiers::{
    ActuatorId, AppId, DeviceId, InstanceId, MessageId, RequestId, SensorId, UserId,
};
pub use message::Message;
pub use placement::{PlacementMap, PlacementRequest, PlacementSlot};
