//! Error types for Cadence

use thiserror::Error;

/// The main error type for Cadence operations
///
/// Only setup and scheduling paths return errors. Input dispatch and the
/// per-frame ticks never fail from the caller's point of view.
#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("Timer queue is full ({capacity} pending submissions)")]
    TimerQueueFull { capacity: usize },

    #[error("Timer delay of {delay:?} is beyond the clock's range")]
    TimerDelayOutOfRange { delay: std::time::Duration },

    #[error("Timer worker has shut down")]
    TimerShutDown,

    #[error("Failed to spawn timer worker: {0}")]
    TimerSpawn(std::io::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("Invalid config: {field} {reason}")]
    InvalidConfig { field: String, reason: String },
}

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;

impl From<toml::de::Error> for CadenceError {
    fn from(err: toml::de::Error) -> Self {
        CadenceError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for CadenceError {
    fn from(err: toml::ser::Error) -> Self {
        CadenceError::TomlSerError(err.to_string())
    }
}
