//! Configuration management
//!
//! This module handles loading, validation, and management of the Fractonix
//! configuration. Configuration is stored in TOML format at
//! ~/.fractonix/config.toml and can be overridden per-deployment through
//! environment variables (a `.env` file in the working directory is honored).
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **identity**: Bot name and lab shown in prompts and embeds
//! - **llm**: Gemini model, endpoint, context window and sampling temperature
//! - **memory**: Location of the conversation memory file
//! - **discord**: Application id and interaction public key
//! - **server**: Bind address and port of the interactions/keep-alive server
//!
//! # Environment Overrides
//!
//! Applied after the file is parsed, before validation:
//!
//! | Variable                 | Field                     |
//! |--------------------------|---------------------------|
//! | `FRACTONIX_NAME`         | `identity.name`           |
//! | `FRACTONIX_LAB`          | `identity.lab`            |
//! | `CONTEXT_LIMIT`          | `llm.context_limit`       |
//! | `GEMINI_MODEL`           | `llm.model`               |
//! | `FRACTONIX_MEMORY_PATH`  | `memory.path`             |
//! | `PORT`                   | `server.port`             |
//! | `DISCORD_APPLICATION_ID` | `discord.application_id`  |
//! | `DISCORD_PUBLIC_KEY`     | `discord.public_key`      |
//!
//! Secrets (`GOOGLE_API_KEY`, `DISCORD_TOKEN`) are never written to the file;
//! see [`Secrets::from_env`].
//!
//! # Examples
//!
//! ```no_run
//! use fractonix_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.llm.model);
//! println!("Context limit: {}", config.llm.context_limit);
//! # Ok(())
//! # }
//! ```

use sdk::errors::BotError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Bot identity
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Generative model settings
    #[serde(default)]
    pub llm: LLMConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Discord application settings
    #[serde(default)]
    pub discord: DiscordConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Identity used in the system prompt and embed titles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_name")]
    pub name: String,

    #[serde(default = "default_identity_lab")]
    pub lab: String,
}

/// Generative model configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LLMConfig {
    /// Base URL for the Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Context window of the model in tokens
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,

    /// Sampling temperature for answers
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    // Note: API key read from GOOGLE_API_KEY, not stored in config
}

/// Memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// JSON file holding every user's memory (supports ~ expansion)
    #[serde(default = "default_memory_path")]
    pub path: PathBuf,
}

/// Discord application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DiscordConfig {
    /// Application (client) id
    #[serde(default)]
    pub application_id: String,

    /// Hex-encoded Ed25519 public key used to verify interactions
    #[serde(default)]
    pub public_key: String,
    // Note: bot token read from DISCORD_TOKEN, not stored in config
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Credentials taken from the environment only
#[derive(Clone, Default)]
pub struct Secrets {
    pub google_api_key: Option<String>,
    pub discord_token: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "<set>"))
            .field("discord_token", &self.discord_token.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl Secrets {
    /// Read credentials from the process environment
    ///
    /// `TOKEN` is accepted as a fallback for `DISCORD_TOKEN`.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            google_api_key: var("GOOGLE_API_KEY"),
            discord_token: var("DISCORD_TOKEN").or_else(|| var("TOKEN")),
        }
    }

    pub fn require_google_api_key(&self) -> Result<&str, BotError> {
        self.google_api_key
            .as_deref()
            .ok_or_else(|| BotError::Config("GOOGLE_API_KEY is not set".to_string()))
    }

    pub fn require_discord_token(&self) -> Result<&str, BotError> {
        self.discord_token
            .as_deref()
            .ok_or_else(|| BotError::Config("DISCORD_TOKEN is not set".to_string()))
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_identity_name() -> String {
    "Fractonix AI".to_string()
}

fn default_identity_lab() -> String {
    "Fractonix Labs".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_context_limit() -> usize {
    128_000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_memory_path() -> PathBuf {
    PathBuf::from("./fractonix_memory.json")
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: default_identity_name(),
            lab: default_identity_lab(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            context_limit: default_context_limit(),
            temperature: default_temperature(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: default_memory_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.fractonix/config.toml)
    ///
    /// If the configuration file doesn't exist, a default one is written
    /// first. Environment overrides are applied and the result validated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, BotError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, BotError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| BotError::Config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides(&std::env::vars().collect())?;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, BotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BotError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let defaults = Self::default();
        let toml_string = toml::to_string_pretty(&defaults)
            .map_err(|e| BotError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| BotError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {:?}", path);

        let mut config = defaults;
        config.apply_env_overrides(&std::env::vars().collect())?;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.fractonix/config.toml)
    fn default_config_path() -> Result<PathBuf, BotError> {
        let home = dirs::home_dir()
            .ok_or_else(|| BotError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".fractonix").join("config.toml"))
    }

    /// Apply environment-style overrides from the given variable map
    pub fn apply_env_overrides(&mut self, vars: &HashMap<String, String>) -> Result<(), BotError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(name) = get("FRACTONIX_NAME") {
            self.identity.name = name.to_string();
        }
        if let Some(lab) = get("FRACTONIX_LAB") {
            self.identity.lab = lab.to_string();
        }
        if let Some(limit) = get("CONTEXT_LIMIT") {
            self.llm.context_limit = limit.parse().map_err(|_| {
                BotError::Config(format!("CONTEXT_LIMIT must be a positive integer, got '{}'", limit))
            })?;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.llm.model = model.to_string();
        }
        if let Some(path) = get("FRACTONIX_MEMORY_PATH") {
            self.memory.path = PathBuf::from(path);
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| BotError::Config(format!("PORT must be a port number, got '{}'", port)))?;
        }
        if let Some(id) = get("DISCORD_APPLICATION_ID") {
            self.discord.application_id = id.to_string();
        }
        if let Some(key) = get("DISCORD_PUBLIC_KEY") {
            self.discord.public_key = key.to_string();
        }

        Ok(())
    }

    /// Validate and process configuration
    ///
    /// Validates ranges and expands `~` in the memory path.
    pub fn validate_and_process(&mut self) -> Result<(), BotError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(BotError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.context_limit == 0 {
            return Err(BotError::Config(
                "context_limit must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(BotError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.identity.name.trim().is_empty() {
            return Err(BotError::Config("identity.name must not be empty".to_string()));
        }

        self.memory.path = expand_path(&self.memory.path)?;

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, BotError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| BotError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| BotError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| BotError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.identity.name, "Fractonix AI");
        assert_eq!(config.identity.lab, "Fractonix Labs");
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.context_limit, 128_000);
        assert_eq!(config.memory.path, PathBuf::from("./fractonix_memory.json"));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(&vars(&[
                ("FRACTONIX_NAME", "Nova"),
                ("FRACTONIX_LAB", "Nova Labs"),
                ("CONTEXT_LIMIT", "64000"),
                ("GEMINI_MODEL", "gemini-2.5-pro"),
                ("FRACTONIX_MEMORY_PATH", "/tmp/mem.json"),
                ("PORT", "8080"),
            ]))
            .unwrap();

        assert_eq!(config.identity.name, "Nova");
        assert_eq!(config.identity.lab, "Nova Labs");
        assert_eq!(config.llm.context_limit, 64_000);
        assert_eq!(config.llm.model, "gemini-2.5-pro");
        assert_eq!(config.memory.path, PathBuf::from("/tmp/mem.json"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config
            .apply_env_overrides(&vars(&[("GEMINI_MODEL", "  "), ("CONTEXT_LIMIT", "")]))
            .unwrap();
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.context_limit, 128_000);
    }

    #[test]
    fn test_invalid_context_limit_env() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(&vars(&[("CONTEXT_LIMIT", "lots")]));
        assert!(matches!(result, Err(BotError::Config(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.core.log_level = "loud".to_string();
        assert!(config.validate_and_process().is_err());

        let mut config = Config::default();
        config.llm.context_limit = 0;
        assert!(config.validate_and_process().is_err());

        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/memory.json");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("memory.json"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path.json");
        assert_eq!(expand_path(&path).unwrap(), path);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[llm]
model = "gemini-2.0-flash"
"#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.context_limit, 128_000);
        assert_eq!(config.identity.name, "Fractonix AI");
    }

    #[test]
    fn test_secrets_debug_redacts() {
        let secrets = Secrets {
            google_api_key: Some("AIzaSecret".to_string()),
            discord_token: None,
        };
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("AIzaSecret"));
        assert!(rendered.contains("<set>"));
        assert!(secrets.require_discord_token().is_err());
        assert_eq!(secrets.require_google_api_key().unwrap(), "AIzaSecret");
    }
}
