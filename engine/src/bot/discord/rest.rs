//! Discord REST client
//!
//! Interaction webhooks (edit original, follow-ups) are authorized by the
//! interaction token in the URL. Channel and guild endpoints need the bot
//! token.

use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use sdk::chat::{ChatError, Moderator, Reply};
use std::time::Duration;
use tracing::debug;

use super::interaction::message_payload;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Clone)]
pub struct DiscordRest {
    client: Client,
    base_url: String,
    application_id: String,
    bot_token: Option<String>,
}

impl std::fmt::Debug for DiscordRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordRest")
            .field("base_url", &self.base_url)
            .field("application_id", &self.application_id)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl DiscordRest {
    pub fn new(application_id: impl Into<String>, bot_token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: DISCORD_API_BASE.to_string(),
            application_id: application_id.into(),
            bot_token,
        }
    }

    /// Point at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_bot_token(&self) -> bool {
        self.bot_token.is_some()
    }

    /// Replace the content of the interaction's original response
    pub async fn edit_original(&self, interaction_token: &str, reply: &Reply) -> Result<(), ChatError> {
        let url = format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.base_url, self.application_id, interaction_token
        );
        let request = with_message(self.client.patch(url), reply)?;
        check(request.send().await).await
    }

    pub async fn create_followup(&self, interaction_token: &str, reply: &Reply) -> Result<(), ChatError> {
        let url = format!(
            "{}/webhooks/{}/{}",
            self.base_url, self.application_id, interaction_token
        );
        let request = with_message(self.client.post(url), reply)?;
        check(request.send().await).await
    }

    /// Post a plain channel message as the bot
    pub async fn create_message(&self, channel_id: &str, reply: &Reply) -> Result<(), ChatError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let request = with_message(self.bot_request(Method::POST, url)?, reply)?;
        check(request.send().await).await
    }

    pub async fn trigger_typing(&self, channel_id: &str) -> Result<(), ChatError> {
        let url = format!("{}/channels/{}/typing", self.base_url, channel_id);
        check(self.bot_request(Method::POST, url)?.send().await).await
    }

    fn bot_request(&self, method: Method, url: String) -> Result<RequestBuilder, ChatError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or(ChatError::Unsupported("bot token not configured"))?;
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("Bot {}", token)))
    }
}

#[async_trait]
impl Moderator for DiscordRest {
    async fn ban(&self, guild_id: &str, user_id: &str) -> Result<(), ChatError> {
        let url = format!("{}/guilds/{}/bans/{}", self.base_url, guild_id, user_id);
        let request = self
            .bot_request(Method::PUT, url)?
            .json(&serde_json::json!({}));
        check(request.send().await).await
    }

    async fn kick(&self, guild_id: &str, user_id: &str) -> Result<(), ChatError> {
        let url = format!("{}/guilds/{}/members/{}", self.base_url, guild_id, user_id);
        check(self.bot_request(Method::DELETE, url)?.send().await).await
    }
}

/// JSON body, or multipart with `payload_json` when files are attached
fn with_message(request: RequestBuilder, reply: &Reply) -> Result<RequestBuilder, ChatError> {
    let payload = message_payload(reply);
    if reply.files.is_empty() {
        return Ok(request.json(&payload));
    }

    let payload_json = serde_json::to_string(&payload)
        .map_err(|e| ChatError::Http(format!("Failed to encode message: {}", e)))?;
    let mut form = multipart::Form::new().part(
        "payload_json",
        multipart::Part::text(payload_json)
            .mime_str("application/json")
            .map_err(|e| ChatError::Http(e.to_string()))?,
    );
    for (i, file) in reply.files.iter().enumerate() {
        form = form.part(
            format!("files[{}]", i),
            multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone()),
        );
    }
    Ok(request.multipart(form))
}

async fn check(result: reqwest::Result<Response>) -> Result<(), ChatError> {
    // Webhook URLs embed the interaction token
    let response = result.map_err(|e| ChatError::Http(e.without_url().to_string()))?;
    let status = response.status();
    if status.is_success() {
        debug!("Discord API responded {}", status);
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChatError::Rejected {
        status: status.as_u16(),
        body,
    })
}
