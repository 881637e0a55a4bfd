//! Fractonix Engine Library
//!
//! This library provides the core functionality of the Fractonix bot.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Interaction signature verification
pub mod crypto;

/// LLM provider abstraction layer
pub mod llm;

/// Per-user conversation memory
pub mod memory;

/// Prompt assembly
pub mod conductor;

/// Command handling, rendering and the Discord adapter
pub mod bot;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
