//! Scenario errors.

use fogmesh_simulation::SetupError;
use fogmesh_topology::TopologyError;
use fogmesh_types::ConfigError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("Application {app}: selectivity for unknown microservice {microservice}")]
    UnknownMicroservice { app: String, microservice: String },
}
