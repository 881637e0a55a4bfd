//! Command handlers for CLI operations
//!
//! - serve: Run the Discord interactions server
//! - ask: Run the ask flow against the terminal
//! - memory: Dump one user's stored memory

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::bot::discord::{self, AppState, DiscordRest};
use crate::bot::{AskRequest, BotContext, ConsoleSurface};
use crate::conductor::Attachment;
use crate::config::{Config, Secrets};
use crate::crypto::SignatureVerifier;
use crate::memory::MemoryStore;

/// Run the interactions endpoint until interrupted
pub async fn handle_serve(config: Config, secrets: &Secrets) -> Result<()> {
    if config.discord.application_id.is_empty() {
        anyhow::bail!("discord.application_id is not set (DISCORD_APPLICATION_ID)");
    }
    let verifier = SignatureVerifier::from_hex(&config.discord.public_key)
        .context("discord.public_key is missing or invalid (DISCORD_PUBLIC_KEY)")?;

    if secrets.discord_token.is_none() {
        tracing::warn!("DISCORD_TOKEN is not set; ban, kick and typing indicators will fail");
    }

    let context = BotContext::from_config(config, secrets)?;
    let rest = Arc::new(DiscordRest::new(
        context.config.discord.application_id.as_str(),
        secrets.discord_token.clone(),
    ));
    let registry = context.registry(Arc::clone(&rest) as Arc<dyn sdk::chat::Moderator>);
    tracing::info!("Registered commands: {}", registry.names().join(", "));

    let state = AppState {
        registry: Arc::new(registry),
        verifier: Arc::new(verifier),
        rest,
        bot_name: context.config.identity.name.clone(),
    };

    discord::serve(
        state,
        &context.config.server.bind,
        context.config.server.port,
    )
    .await
}

/// Answer one question in the terminal, remembering it under `user`
pub async fn handle_ask(
    config: Config,
    secrets: &Secrets,
    question: String,
    user: String,
    image: Option<String>,
) -> Result<()> {
    let context = BotContext::from_config(config, secrets)?;

    let mut request = AskRequest::new(user, question);
    if let Some(url) = image {
        request = request.with_image(Attachment::from_url(url));
    }

    let surface = Arc::new(ConsoleSurface::new());
    let answer = context
        .ask
        .ask(request, surface)
        .await
        .context("Ask failed")?;

    println!("{}", answer);
    Ok(())
}

/// Print the stored record for `user` as JSON
pub fn handle_memory(config: &Config, user: &str) -> Result<()> {
    let store = MemoryStore::load(&config.memory.path);
    println!("{}", describe_memory(&store, user)?);
    Ok(())
}

fn describe_memory(store: &MemoryStore, user: &str) -> Result<String> {
    Ok(match store.get(user) {
        Some(memory) => serde_json::to_string_pretty(&memory)?,
        None => format!(
            "No memory stored for user {} in {}",
            user,
            store.path().display()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Turn;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_user_names_the_memory_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let store = MemoryStore::load(&path);

        let text = describe_memory(&store, "404").unwrap();

        assert!(text.starts_with("No memory stored for user 404 in "));
        assert!(text.ends_with(&path.display().to_string()));
    }

    #[test]
    fn test_known_user_is_printed_as_json() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::load(dir.path().join("memory.json"));
        store
            .update("42", |m| m.turns.push(Turn::user("hello")))
            .unwrap();

        let text = describe_memory(&store, "42").unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["turns"][0]["text"], "hello");
    }
}
