//! Slash command dispatch
//!
//! A static registry maps command names to handlers. Handlers receive an
//! [`Invocation`] carrying the parsed options and the chat surface to answer
//! on. Errors never escape the dispatcher: they are logged and the user sees
//! a short ephemeral notice instead.

use async_trait::async_trait;
use sdk::chat::{ChatSurface, Color, Embed, Moderator, Reply, UserRef};
use sdk::errors::{BotError, BotErrorExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::ask::{AskRequest, AskService};
use crate::conductor::Attachment;

pub const ERROR_NOTICE: &str = "❌ There was an error executing that command.";

/// Discord permission bits checked by moderation commands
pub mod permissions {
    pub const KICK_MEMBERS: u64 = 1 << 1;
    pub const BAN_MEMBERS: u64 = 1 << 2;
    pub const ADMINISTRATOR: u64 = 1 << 3;
}

/// A resolved command option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    User(UserRef),
    Attachment(Attachment),
}

/// Named options of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    values: HashMap<String, OptionValue>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(OptionValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_user(&self, name: &str) -> Option<&UserRef> {
        match self.values.get(name) {
            Some(OptionValue::User(u)) => Some(u),
            _ => None,
        }
    }

    pub fn get_attachment(&self, name: &str) -> Option<&Attachment> {
        match self.values.get(name) {
            Some(OptionValue::Attachment(a)) => Some(a),
            _ => None,
        }
    }

    pub fn require_string(&self, name: &str) -> Result<&str, BotError> {
        self.get_string(name)
            .ok_or_else(|| BotError::MissingOption(name.to_string()))
    }

    pub fn require_integer(&self, name: &str) -> Result<i64, BotError> {
        self.get_integer(name)
            .ok_or_else(|| BotError::MissingOption(name.to_string()))
    }

    pub fn require_user(&self, name: &str) -> Result<&UserRef, BotError> {
        self.get_user(name)
            .ok_or_else(|| BotError::MissingOption(name.to_string()))
    }
}

/// One command call from one user
#[derive(Clone)]
pub struct Invocation {
    pub command: String,
    pub user: UserRef,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    /// Resolved permission bits of the invoking member, guild only
    pub member_permissions: Option<u64>,
    pub options: CommandOptions,
    pub surface: Arc<dyn ChatSurface>,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.command)
            .field("user", &self.user)
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("options", &self.options)
            .finish()
    }
}

impl Invocation {
    fn require_guild(&self) -> Result<&str, BotError> {
        self.guild_id.as_deref().ok_or(BotError::GuildOnly)
    }

    fn require_permission(&self, bit: u64, name: &str) -> Result<(), BotError> {
        let granted = self
            .member_permissions
            .map(|p| p & (bit | permissions::ADMINISTRATOR) != 0)
            .unwrap_or(false);
        if granted {
            Ok(())
        } else {
            Err(BotError::PermissionDenied(name.to_string()))
        }
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Shown next to the command in the help menu
    fn icon(&self) -> &'static str {
        "•"
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(), BotError>;
}

/// Name to handler mapping built once at startup
#[derive(Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full command set: ask, ban, kick, remind and help
    pub fn standard(ask: Arc<AskService>, moderator: Arc<dyn Moderator>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AskCommand::new(ask)));
        registry.register(Arc::new(BanCommand::new(Arc::clone(&moderator))));
        registry.register(Arc::new(KickCommand::new(moderator)));
        registry.register(Arc::new(RemindCommand));
        let help = HelpCommand::from_registry(&registry);
        registry.register(Arc::new(help));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        debug!("Registered command /{}", handler.name());
        self.handlers.insert(handler.name(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `invocation`
    ///
    /// Returns `false` when no handler matches. Handler errors are reported
    /// to the user and logged, never returned.
    pub async fn dispatch(&self, invocation: &Invocation) -> bool {
        let Some(handler) = self.handlers.get(invocation.command.as_str()) else {
            warn!("Ignoring unknown command /{}", invocation.command);
            return false;
        };

        info!(
            "User {} invoked /{}",
            invocation.user.id, invocation.command
        );

        if let Err(e) = handler.execute(invocation).await {
            if e.is_recoverable() {
                warn!(
                    "Command /{} failed: {} ({})",
                    invocation.command,
                    e,
                    e.user_hint()
                );
            } else {
                error!(
                    "Command /{} failed and needs operator attention: {}",
                    invocation.command, e
                );
            }
            report_failure(invocation.surface.as_ref()).await;
        }
        true
    }
}

/// Show the error notice, as a follow-up if the interaction was already answered
async fn report_failure(surface: &dyn ChatSurface) {
    let notice = Reply::text(ERROR_NOTICE).ephemeral();
    if surface.reply(notice.clone()).await.is_ok() {
        return;
    }
    if let Err(e) = surface.follow_up(notice).await {
        warn!("Could not deliver error notice: {}", e);
    }
}

pub struct AskCommand {
    service: Arc<AskService>,
}

impl AskCommand {
    pub fn new(service: Arc<AskService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CommandHandler for AskCommand {
    fn name(&self) -> &'static str {
        "ask"
    }

    fn description(&self) -> &'static str {
        "Ask the AI anything"
    }

    fn icon(&self) -> &'static str {
        "💬"
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(), BotError> {
        let mut request = AskRequest::new(
            invocation.user.id.as_str(),
            invocation.options.require_string("question")?,
        );
        if let Some(image) = invocation.options.get_attachment("image") {
            request = request.with_image(image.clone());
        }
        self.service
            .ask(request, Arc::clone(&invocation.surface))
            .await?;
        Ok(())
    }
}

pub struct BanCommand {
    moderator: Arc<dyn Moderator>,
}

impl BanCommand {
    pub fn new(moderator: Arc<dyn Moderator>) -> Self {
        Self { moderator }
    }
}

#[async_trait]
impl CommandHandler for BanCommand {
    fn name(&self) -> &'static str {
        "ban"
    }

    fn description(&self) -> &'static str {
        "Ban a member"
    }

    fn icon(&self) -> &'static str {
        "🔨"
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(), BotError> {
        let guild_id = invocation.require_guild()?;
        invocation.require_permission(permissions::BAN_MEMBERS, "BAN_MEMBERS")?;
        let target = invocation.options.require_user("target")?;

        self.moderator.ban(guild_id, &target.id).await?;
        info!("Banned {} from guild {}", target.id, guild_id);

        invocation
            .surface
            .reply(Reply::text(format!("🔨 {} was banned.", target.tag)))
            .await?;
        Ok(())
    }
}

pub struct KickCommand {
    moderator: Arc<dyn Moderator>,
}

impl KickCommand {
    pub fn new(moderator: Arc<dyn Moderator>) -> Self {
        Self { moderator }
    }
}

#[async_trait]
impl CommandHandler for KickCommand {
    fn name(&self) -> &'static str {
        "kick"
    }

    fn description(&self) -> &'static str {
        "Kick a member"
    }

    fn icon(&self) -> &'static str {
        "👢"
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(), BotError> {
        let guild_id = invocation.require_guild()?;
        invocation.require_permission(permissions::KICK_MEMBERS, "KICK_MEMBERS")?;
        let target = invocation.options.require_user("target")?;

        self.moderator.kick(guild_id, &target.id).await?;
        info!("Kicked {} from guild {}", target.id, guild_id);

        invocation
            .surface
            .reply(Reply::text(format!("👢 {} was kicked.", target.tag)))
            .await?;
        Ok(())
    }
}

pub struct RemindCommand;

#[async_trait]
impl CommandHandler for RemindCommand {
    fn name(&self) -> &'static str {
        "remind"
    }

    fn description(&self) -> &'static str {
        "Set a reminder"
    }

    fn icon(&self) -> &'static str {
        "⏰"
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(), BotError> {
        let minutes = invocation.options.require_integer("minutes")?;
        let message = invocation.options.require_string("message")?.to_string();

        let delay = u64::try_from(minutes)
            .ok()
            .filter(|m| *m >= 1)
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
            .ok_or_else(|| BotError::InvalidOption {
                name: "minutes".to_string(),
                reason: format!("expected a positive number of minutes, got {}", minutes),
            })?;

        invocation
            .surface
            .reply(Reply::text(format!(
                "⏰ Reminder set for **{} min**: \"{}\"",
                minutes, message
            )))
            .await?;

        let surface = Arc::clone(&invocation.surface);
        let user_id = invocation.user.id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let text = format!("🔔 <@{}> Reminder: {}", user_id, message);
            if let Err(e) = surface.follow_up(Reply::text(text)).await {
                warn!("Failed to deliver reminder to {}: {}", user_id, e);
            }
        });

        Ok(())
    }
}

pub struct HelpCommand {
    lines: Vec<String>,
}

impl HelpCommand {
    /// Describe every command registered so far, plus help itself
    pub fn from_registry(registry: &CommandRegistry) -> Self {
        let mut lines: Vec<String> = registry
            .handlers
            .values()
            .map(|h| format!("{} /{} — {}", h.icon(), h.name(), h.description()))
            .collect();
        lines.push("❓ /help — Show this menu".to_string());
        Self { lines }
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "Show this menu"
    }

    fn icon(&self) -> &'static str {
        "❓"
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(), BotError> {
        let embed = Embed::new("📜 Bot Commands")
            .description(self.lines.join("\n"))
            .color(Color::Blue);
        invocation.surface.reply(Reply::embed(embed)).await?;
        Ok(())
    }
}
