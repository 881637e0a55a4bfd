//! Fractonix SDK
//!
//! Shared contracts between the engine and the chat platforms it talks to:
//! the error taxonomy and the chat surface traits.

/// Chat surface contracts
pub mod chat;

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use chat::{ChatError, ChatSurface, Color, Embed, FileAttachment, Moderator, Reply, UserRef};
pub use errors::{BotError, BotErrorExt};
