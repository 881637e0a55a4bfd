//! LLM Provider Abstraction Layer
//!
//! This module provides the interface the bot uses to talk to a hosted
//! generative model. The `LLMProvider` trait exposes a unary call (used for
//! memory summarization) and a streaming call (used for answers). Prompt
//! content is modelled after the Gemini `contents` shape: role-tagged
//! entries made of text and inline binary parts.

use async_trait::async_trait;
use futures::Stream;
use sdk::errors::BotError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

pub mod gemini;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Incremental text deltas produced by a streaming call
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for BotError {
    fn from(err: LLMError) -> Self {
        BotError::LLMProvider(err.to_string())
    }
}

/// Author of a content entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation
    User,

    /// The model's replies
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// Base64-encoded binary payload with its MIME type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// One inline content block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(inline_data: InlineData) -> Self {
        Part::InlineData { inline_data }
    }

    /// Text carried by this block, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::InlineData { .. } => None,
        }
    }
}

/// A role-tagged group of parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Single text part authored by `role`
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![Part::text(text)])
    }
}

/// Sampling settings sent with every call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: i64,
    pub temperature: f32,
}

impl GenerationConfig {
    pub fn new(max_output_tokens: i64, temperature: f32) -> Self {
        Self {
            max_output_tokens,
            temperature,
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "gemini")
    fn name(&self) -> &str;

    /// Generate a complete response in one call
    ///
    /// # Returns
    /// * `Ok(String)` - The concatenated text of the first candidate
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, contents: &[Content], config: GenerationConfig) -> Result<String>;

    /// Start a streaming generation
    ///
    /// The returned stream yields text deltas in order. Errors that occur
    /// after the stream was opened are yielded as items.
    async fn generate_stream(
        &self,
        contents: &[Content],
        config: GenerationConfig,
    ) -> Result<TextStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_serialization_matches_wire_shape() {
        let text = serde_json::to_value(Part::text("hi")).unwrap();
        assert_eq!(text, serde_json::json!({"text": "hi"}));

        let image = serde_json::to_value(Part::inline(InlineData {
            mime_type: "image/png".to_string(),
            data: "AAAA".to_string(),
        }))
        .unwrap();
        assert_eq!(
            image,
            serde_json::json!({"inlineData": {"mimeType": "image/png", "data": "AAAA"}})
        );
    }

    #[test]
    fn test_content_roles_serialize_lowercase() {
        let content = Content::text(Role::Model, "ok");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn test_generation_config_camel_case() {
        let json = serde_json::to_value(GenerationConfig::new(300, 0.4)).unwrap();
        assert_eq!(json["maxOutputTokens"], 300);
        assert!(json.get("temperature").is_some());
    }

    #[test]
    fn test_llm_error_converts_to_bot_error() {
        let err: BotError = LLMError::RateLimitExceeded.into();
        assert!(matches!(err, BotError::LLMProvider(msg) if msg.contains("Rate limit")));
    }
}
