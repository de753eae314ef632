//! Static device topology.
//!
//! The topology is built once from device declarations and never changes:
//!
//! - children are derived from parent declarations
//! - cluster siblings are formed per (level identifier, parent)
//! - all-pairs next-hop routing tables are computed by iterative relaxation
//!
//! Derived queries give each device's orchestrator, each orchestrator's
//! domain and the leaf-to-root paths placement walks.

mod builder;
mod error;
mod routing;
mod topology;

pub use builder::TopologyBuilder;
pub use error::TopologyError;
pub use routing::RoutingTable;
pub use topology::{Link, Topology};
