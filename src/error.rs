//! Error types for Career Assist.

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reply error: {0}")]
    Reply(#[from] ReplyError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures of the reply backend.
///
/// Every variant is recoverable: the session records a single fallback
/// message and goes back to idle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("Reply timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Reply backend {backend} failed: {reason}")]
    Failed { backend: String, reason: String },

    #[error("Message too long for reply backend: {length} > {max}")]
    InputTooLong { length: usize, max: usize },

    #[error("Reply cancelled")]
    Cancelled,
}

/// Session lookup and lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {id} not found")]
    NotFound { id: Uuid },
}

/// Outer surface (CLI / HTTP) errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
