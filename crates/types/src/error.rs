//! Configuration parsing errors.

/// Errors raised while interpreting configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown device role: {0}")]
    UnknownRole(String),

    #[error("Unknown placement strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown message direction: {0}")]
    UnknownDirection(String),
}
