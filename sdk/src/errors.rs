//! Error types and handling
//!
//! This module provides the error types used throughout the Fractonix bot.
//! All errors implement the `BotErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Hints are static strings. They never echo API keys, interaction tokens,
//! or storage paths back into a chat channel.

use thiserror::Error;

use crate::chat::ChatError;

/// Trait for bot error extensions
///
/// Provides additional context for errors: a user-facing hint that is safe
/// to show in a chat channel, and whether retrying can help.
pub trait BotErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the user. Non-recoverable errors
    /// need an operator to fix configuration or credentials.
    fn is_recoverable(&self) -> bool;
}

/// Main bot error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Storage**: Memory file read/write failures
/// - **LLM Provider**: Model API failures
/// - **Chat**: Chat platform API failures
/// - **Command**: Malformed or unknown command invocations
/// - **Security**: Interaction signature verification failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{BotError, BotErrorExt};
///
/// let error = BotError::MissingOption("question".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = BotError::Config("missing api key".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum BotError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Chat platform errors
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    // Command errors
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing command option: {0}")]
    MissingOption(String),

    #[error("Invalid command option {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("Command must be used inside a server")]
    GuildOnly,

    #[error("Missing permission: {0}")]
    PermissionDenied(String),

    // Security errors
    #[error("Invalid interaction signature")]
    InvalidSignature,

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BotErrorExt for BotError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "The bot is misconfigured. Ask an administrator to check it",
            Self::Storage(_) => "Conversation memory could not be saved",
            Self::LLMProvider(_) => "The AI model is unavailable right now. Try again shortly",
            Self::Chat(_) => "Could not talk to the chat platform. Try again",
            Self::UnknownCommand(_) => "That command does not exist",
            Self::MissingOption(_) => "A required command option is missing",
            Self::InvalidOption { .. } => "A command option has an invalid value",
            Self::GuildOnly => "Use this command inside a server",
            Self::PermissionDenied(_) => "You do not have permission to do that",
            Self::InvalidSignature => "Request could not be verified",
            Self::Network(_) => "Network operation failed. Try again",
            Self::Serialization(_) => "Received malformed data",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_converts() {
        let err: BotError = ChatError::AlreadyResponded.into();
        assert!(matches!(err, BotError::Chat(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_config_is_not_recoverable() {
        assert!(!BotError::Config("x".to_string()).is_recoverable());
        assert!(!BotError::InvalidSignature.is_recoverable());
        assert!(BotError::Storage("disk full".to_string()).is_recoverable());
    }

    #[test]
    fn test_hint_does_not_leak_detail() {
        let err = BotError::LLMProvider("key=AIzaSecret".to_string());
        assert!(!err.user_hint().contains("AIza"));
        assert!(err.to_string().contains("AIza"));
    }
}
