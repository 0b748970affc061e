//! Platform error types

use thiserror::Error;

/// Host-related errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// A sensor the caller asked for does not exist on this host
    #[error("Sensor not available: {0}")]
    SensorUnavailable(String),

    /// The host refused a frame or timer request
    #[error("Host request rejected: {0}")]
    Rejected(String),

    /// Generic host error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
