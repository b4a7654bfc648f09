//! Error types for agentsim-event

use thiserror::Error;

/// Errors that can occur in the event system
#[derive(Debug, Error)]
pub enum EventError {
    /// Failure reported by a subscriber from inside its callback
    #[error("Handler error: {0}")]
    Handler(String),

    /// Subscriber failure as recorded by the dispatcher (error return or panic)
    #[error("Subscriber '{subscriber}' failed on event '{class}': {reason}")]
    Subscriber {
        subscriber: String,
        class: String,
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventError {
    /// Shorthand for a subscriber-side failure
    pub fn handler(reason: impl Into<String>) -> Self {
        Self::Handler(reason.into())
    }
}

/// Result type alias for event operations
pub type Result<T> = std::result::Result<T, EventError>;
