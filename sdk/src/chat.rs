//! Chat surface contracts
//!
//! The engine never speaks a chat platform's wire protocol directly. It
//! renders into [`Reply`] values and hands them to a [`ChatSurface`], which
//! follows the deferred-reply pattern: acknowledge an interaction once, then
//! edit the same outbound message as often as needed.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a chat surface implementation
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Platform rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Interaction already acknowledged")]
    AlreadyResponded,

    #[error("Operation not supported by this surface: {0}")]
    Unsupported(&'static str),
}

/// Embed accent colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Blue,
    Green,
    Red,
}

impl Color {
    /// RGB value as the platform expects it
    pub fn rgb(self) -> u32 {
        match self {
            Color::Blue => 0x3498DB,
            Color::Green => 0x57F287,
            Color::Red => 0xED4245,
        }
    }
}

/// A titled rich-text card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: Color,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            color: Color::Blue,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// A file uploaded alongside a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub name: String,
    pub description: String,
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    pub fn text(name: impl Into<String>, description: impl Into<String>, body: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            bytes: body.as_bytes().to_vec(),
        }
    }
}

/// One rendered outbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub files: Vec<FileAttachment>,
    /// Only visible to the invoking user
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file: FileAttachment) -> Self {
        self.files.push(file);
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// A user referenced by a command option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    /// Display handle, e.g. `name` or `name#1234`
    pub tag: String,
}

/// The interaction a command is answering
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Acknowledge the interaction without content yet
    async fn defer_reply(&self) -> Result<(), ChatError>;

    /// Send the initial response
    async fn reply(&self, reply: Reply) -> Result<(), ChatError>;

    /// Replace the content of the initial response
    async fn edit_reply(&self, reply: Reply) -> Result<(), ChatError>;

    /// Post an additional message after the initial response
    async fn follow_up(&self, reply: Reply) -> Result<(), ChatError>;

    /// Show a typing indicator in the originating channel
    async fn send_typing(&self) -> Result<(), ChatError>;
}

/// Guild moderation primitives
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn ban(&self, guild_id: &str, user_id: &str) -> Result<(), ChatError>;

    async fn kick(&self, guild_id: &str, user_id: &str) -> Result<(), ChatError>;
}
