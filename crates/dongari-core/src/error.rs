//! Error types shared across the dongari workspace.

use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, DongariError>;

/// All the ways the backend core can fail.
#[derive(Debug, Error)]
pub enum DongariError {
    /// A notification spec was rejected before anything was armed
    /// (empty token set, empty topic name, malformed trigger).
    /// Surfaced synchronously to the schedule/cancel caller.
    #[error("invalid notification spec: {0}")]
    InvalidSpec(String),

    /// The durable store failed. Fatal at boot (the process must not
    /// start with a silently empty schedule), logged on the fire path.
    #[error("store error: {0}")]
    Store(String),

    /// The push provider failed or timed out. Logged with the notice id;
    /// never retried by this core.
    #[error("push provider error: {0}")]
    Provider(String),

    /// Configuration could not be read, parsed, or written.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
