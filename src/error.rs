//! Error types for the playback layer

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration values that parse but make no sense
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two queue entries share the same id, which would make navigation ambiguous
    #[error("Duplicate queue item id: {0}")]
    DuplicateQueueItem(String),

    #[error("Item {0} is not part of the queue")]
    ItemNotInQueue(String),

    /// The controller task has exited and no longer accepts commands
    #[error("Playback controller is no longer running")]
    ControllerClosed,
}

/// Convenience Result type using the crate Error
pub type Result<T> = std::result::Result<T, Error>;
