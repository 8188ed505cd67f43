use thiserror::Error;

/// Failure of a command issued to the conferencing platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("platform rejected command: {0}")]
    Rejected(String),

    #[error("call not found: {0}")]
    CallNotFound(String),

    #[error("platform transport error: {0}")]
    Transport(String),
}

/// Errors surfaced by a [`crate::BotHandle`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    /// The state machine task has exited and no longer accepts input.
    #[error("call state machine is not running")]
    Stopped,
}
