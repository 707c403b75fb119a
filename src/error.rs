//! Agent Embed error types

use thiserror::Error;

/// Agent Embed error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (invalid widget options, bad origin, unreadable config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host page has no container with the expected id
    #[error("Mount point not found: #{0}")]
    MountPoint(String),

    /// Cross-origin message could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Render target rejected an operation
    #[error("Render error: {0}")]
    Render(String),

    /// The widget runtime has shut down
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for Agent Embed operations
pub type Result<T> = std::result::Result<T, Error>;
