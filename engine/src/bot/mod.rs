//! Bot wiring
//!
//! Builds the long-lived services from configuration: the memory store,
//! the model provider, the ask flow and the command registry.

pub mod ask;
pub mod commands;
pub mod console;
pub mod discord;
pub mod renderer;

#[cfg(test)]
pub(crate) mod testing;

use sdk::chat::Moderator;
use sdk::errors::BotError;
use std::sync::Arc;
use tracing::info;

use crate::conductor::{AttachmentFetcher, ContextAssembler, HttpAttachmentFetcher};
use crate::config::{Config, IdentityConfig, Secrets};
use crate::llm::gemini::GeminiProvider;
use crate::llm::LLMProvider;
use crate::memory::{Compactor, MemoryStore};

pub use ask::{AskRequest, AskService};
pub use commands::{CommandHandler, CommandOptions, CommandRegistry, Invocation, OptionValue};
pub use console::ConsoleSurface;
pub use renderer::StreamRenderer;

/// System instruction sent with every model call
pub fn system_prompt(identity: &IdentityConfig) -> String {
    format!(
        "You are {name}, a helpful, pragmatic AI assistant developed by {lab}. \
         Only when the user explicitly asks about your identity, origin, creator, \
         or what you are, say that you are {name}, developed by {lab}, and explain \
         that you were trained to help them the way language models usually are. \
         Do not restrict yourself to mentioning your origin: answer their questions \
         carefully and think clearly about what they say.",
        name = identity.name,
        lab = identity.lab,
    )
}

/// Shared services for one running bot
pub struct BotContext {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub ask: Arc<AskService>,
}

impl BotContext {
    /// Wire services around an existing provider and fetcher
    pub fn new(
        config: Config,
        provider: Arc<dyn LLMProvider>,
        fetcher: Arc<dyn AttachmentFetcher>,
    ) -> Self {
        let store = Arc::new(MemoryStore::load(&config.memory.path));
        let compactor = Arc::new(Compactor::new(Arc::clone(&provider), Arc::clone(&store)));
        let assembler = ContextAssembler::new(
            Arc::clone(&store),
            compactor,
            fetcher,
            config.llm.context_limit,
        );
        let ask = Arc::new(AskService::new(
            provider,
            Arc::clone(&store),
            assembler,
            StreamRenderer::new(config.identity.name.as_str()),
            config.llm.temperature,
        ));

        Self { config, store, ask }
    }

    /// Wire services against the Gemini API
    ///
    /// # Errors
    ///
    /// Returns `BotError::Config` when `GOOGLE_API_KEY` is missing.
    pub fn from_config(config: Config, secrets: &Secrets) -> Result<Self, BotError> {
        let api_key = secrets.require_google_api_key()?;
        let provider = GeminiProvider::new(&config.llm, api_key)
            .with_system_instruction(system_prompt(&config.identity));
        info!(
            "Using {} with a {} token context window",
            provider.model(),
            config.llm.context_limit
        );

        Ok(Self::new(
            config,
            Arc::new(provider),
            Arc::new(HttpAttachmentFetcher::default()),
        ))
    }

    /// The full command registry, moderating through `moderator`
    pub fn registry(&self, moderator: Arc<dyn Moderator>) -> CommandRegistry {
        CommandRegistry::standard(Arc::clone(&self.ask), moderator)
    }
}
