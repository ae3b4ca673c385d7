//! Error types for Kasparro Core
//!
//! Provides a unified error type for the coordination core. Task and agent
//! level failures are never surfaced through this type; they travel as
//! structured status (task state, `GOAL_COMPLETE{success=false}`, workflow
//! reports). This error covers configuration, payload decoding and the bodies
//! of bus handlers and blackboard watchers.

use thiserror::Error;

/// Result type for Kasparro Core operations
pub type Result<T> = std::result::Result<T, KasparroError>;

/// Unified error type for Kasparro Core
#[derive(Error, Debug)]
pub enum KasparroError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Agent error
    #[error("Agent error: {0}")]
    Agent(String),

    /// Message handling error
    #[error("Message error: {0}")]
    Message(String),

    /// Channel error (communication failure)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl KasparroError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        KasparroError::Config(msg.into())
    }

    /// Create an agent error
    pub fn agent(msg: impl Into<String>) -> Self {
        KasparroError::Agent(msg.into())
    }

    /// Create a message error
    pub fn message(msg: impl Into<String>) -> Self {
        KasparroError::Message(msg.into())
    }

    /// Create a channel error
    pub fn channel(msg: impl Into<String>) -> Self {
        KasparroError::Channel(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        KasparroError::NotFound(msg.into())
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        KasparroError::InvalidOperation(msg.into())
    }
}

impl From<serde_json::Error> for KasparroError {
    fn from(err: serde_json::Error) -> Self {
        KasparroError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for KasparroError {
    fn from(err: toml::de::Error) -> Self {
        KasparroError::Config(err.to_string())
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for KasparroError {
    fn from(err: crossbeam_channel::SendError<T>) -> Self {
        KasparroError::Channel(format!("Send error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KasparroError::not_found("agent 'parser_agent'");
        assert_eq!(err.to_string(), "Not found: agent 'parser_agent'");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: KasparroError = parse.unwrap_err().into();
        assert!(matches!(err, KasparroError::Serialization(_)));
    }

    #[test]
    fn test_from_send_error() {
        let (tx, rx) = crossbeam_channel::bounded::<u8>(1);
        drop(rx);
        let err: KasparroError = tx.send(1).unwrap_err().into();
        assert!(err.to_string().starts_with("Channel error: Send error"));
    }
}
