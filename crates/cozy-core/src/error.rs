use thiserror::Error;

/// Top-level error type for the Cozy workspace.
///
/// Subsystem crates define their own error types and convert into (or wrap)
/// `CozyError` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CozyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CozyError {
    fn from(err: toml::de::Error) -> Self {
        CozyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CozyError {
    fn from(err: toml::ser::Error) -> Self {
        CozyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CozyError {
    fn from(err: serde_json::Error) -> Self {
        CozyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Cozy operations.
pub type Result<T> = std::result::Result<T, CozyError>;
