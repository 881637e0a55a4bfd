//! Interaction payloads
//!
//! Just enough of Discord's interaction and message objects to route slash
//! commands and to render [`Reply`] values back into message JSON.

use sdk::chat::{Reply, UserRef};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::bot::commands::{CommandOptions, OptionValue};
use crate::conductor::Attachment;

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u8 = 5;

/// Message flag hiding a response from everyone but the invoker
pub const FLAG_EPHEMERAL: u64 = 1 << 6;

const OPTION_STRING: u8 = 3;
const OPTION_INTEGER: u8 = 4;
const OPTION_USER: u8 = 6;
const OPTION_ATTACHMENT: u8 = 11;

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub application_id: String,
    pub token: String,
    #[serde(default)]
    pub data: Option<CommandData>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<Member>,
    /// Set instead of `member` outside guilds
    #[serde(default)]
    pub user: Option<DiscordUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub resolved: Resolved,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub users: HashMap<String, DiscordUser>,
    #[serde(default)]
    pub attachments: HashMap<String, ResolvedAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<DiscordUser>,
    /// Permission bitfield, serialized as a decimal string
    #[serde(default)]
    pub permissions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
}

impl DiscordUser {
    /// `name#1234` for legacy accounts, bare `name` otherwise
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if !d.is_empty() && d != "0" => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }

    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id.clone(),
            tag: self.tag(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedAttachment {
    pub id: String,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Interaction {
    /// The member's user in guilds, the plain user in DMs
    pub fn invoking_user(&self) -> Option<&DiscordUser> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }

    pub fn member_permissions(&self) -> Option<u64> {
        self.member
            .as_ref()
            .and_then(|m| m.permissions.as_deref())
            .and_then(|p| p.parse().ok())
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.name.as_str())
    }

    /// Top-level options with user and attachment ids resolved
    ///
    /// Options of unknown types or referencing missing resolved entries are
    /// skipped.
    pub fn command_options(&self) -> CommandOptions {
        let mut options = CommandOptions::new();
        let Some(data) = &self.data else {
            return options;
        };

        for opt in &data.options {
            let Some(value) = &opt.value else { continue };
            let parsed = match opt.kind {
                OPTION_STRING => value.as_str().map(|s| OptionValue::String(s.to_string())),
                OPTION_INTEGER => value.as_i64().map(OptionValue::Integer),
                OPTION_USER => value
                    .as_str()
                    .and_then(|id| data.resolved.users.get(id))
                    .map(|u| OptionValue::User(u.to_ref())),
                OPTION_ATTACHMENT => value
                    .as_str()
                    .and_then(|id| data.resolved.attachments.get(id))
                    .map(|a| {
                        OptionValue::Attachment(Attachment {
                            url: a.url.clone(),
                            content_type: a.content_type.clone(),
                            filename: Some(a.filename.clone()),
                        })
                    }),
                _ => None,
            };
            if let Some(parsed) = parsed {
                options.insert(opt.name.as_str(), parsed);
            }
        }
        options
    }
}

/// Message object for `reply` without its file bytes
pub fn message_payload(reply: &Reply) -> Value {
    let mut body = json!({
        "content": reply.content.as_deref().unwrap_or(""),
        "embeds": reply
            .embeds
            .iter()
            .map(|e| json!({
                "title": e.title,
                "description": e.description,
                "color": e.color.rgb(),
            }))
            .collect::<Vec<_>>(),
        "allowed_mentions": { "parse": ["users"] },
    });

    if !reply.files.is_empty() {
        body["attachments"] = reply
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| json!({ "id": i, "filename": f.name, "description": f.description }))
            .collect();
    }
    if reply.ephemeral {
        body["flags"] = json!(FLAG_EPHEMERAL);
    }
    body
}

/// Interaction response carrying `reply` as a new message
pub fn message_response(reply: &Reply) -> Value {
    json!({ "type": RESPONSE_CHANNEL_MESSAGE, "data": message_payload(reply) })
}

pub fn deferred_response() -> Value {
    json!({ "type": RESPONSE_DEFERRED_CHANNEL_MESSAGE })
}

pub fn pong_response() -> Value {
    json!({ "type": RESPONSE_PONG })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::chat::{Color, Embed, FileAttachment};

    const ASK_WITH_IMAGE: &str = r#"{
        "id": "1",
        "type": 2,
        "application_id": "app",
        "token": "tok",
        "guild_id": "g",
        "channel_id": "c",
        "member": {
            "user": {"id": "42", "username": "alice", "discriminator": "0"},
            "permissions": "6"
        },
        "data": {
            "name": "ask",
            "options": [
                {"name": "question", "type": 3, "value": "what is this"},
                {"name": "image", "type": 11, "value": "900"}
            ],
            "resolved": {
                "attachments": {
                    "900": {"id": "900", "filename": "cat.png", "url": "https://cdn/cat.png", "content_type": "image/png"}
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_guild_command() {
        let interaction: Interaction = serde_json::from_str(ASK_WITH_IMAGE).unwrap();
        assert_eq!(interaction.kind, INTERACTION_APPLICATION_COMMAND);
        assert_eq!(interaction.command_name(), Some("ask"));
        assert_eq!(interaction.invoking_user().unwrap().tag(), "alice");
        assert_eq!(interaction.member_permissions(), Some(6));

        let options = interaction.command_options();
        assert_eq!(options.get_string("question"), Some("what is this"));
        let image = options.get_attachment("image").unwrap();
        assert_eq!(image.url, "https://cdn/cat.png");
        assert_eq!(image.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_resolves_user_option_and_dm_user() {
        let raw = r#"{
            "id": "1", "type": 2, "application_id": "app", "token": "tok",
            "user": {"id": "7", "username": "bob", "discriminator": "1234"},
            "data": {
                "name": "ban",
                "options": [{"name": "target", "type": 6, "value": "8"}],
                "resolved": {"users": {"8": {"id": "8", "username": "eve"}}}
            }
        }"#;
        let interaction: Interaction = serde_json::from_str(raw).unwrap();
        assert_eq!(interaction.invoking_user().unwrap().tag(), "bob#1234");
        assert_eq!(interaction.member_permissions(), None);

        let target = interaction.command_options();
        let target = target.get_user("target").unwrap();
        assert_eq!(target.id, "8");
        assert_eq!(target.tag, "eve");
    }

    #[test]
    fn test_unsupported_option_types_are_skipped() {
        let raw = r#"{
            "id": "1", "type": 2, "application_id": "app", "token": "tok",
            "user": {"id": "7", "username": "bob"},
            "data": {
                "name": "remind",
                "options": [
                    {"name": "minutes", "type": 4, "value": 5},
                    {"name": "loud", "type": 5, "value": true}
                ]
            }
        }"#;
        let interaction: Interaction = serde_json::from_str(raw).unwrap();

        let options = interaction.command_options();
        assert_eq!(options.get_integer("minutes"), Some(5));
        assert!(options.get("loud").is_none());
    }

    #[test]
    fn test_message_payload() {
        let reply = Reply::embed(Embed::new("Bot").description("hi").color(Color::Green))
            .with_file(FileAttachment::text("fractonix.txt", "Full response", "x"))
            .ephemeral();
        let body = message_payload(&reply);

        assert_eq!(body["embeds"][0]["title"], "Bot");
        assert_eq!(body["embeds"][0]["color"], 0x57F287);
        assert_eq!(body["attachments"][0]["filename"], "fractonix.txt");
        assert_eq!(body["flags"], 64);
    }

    #[test]
    fn test_plain_text_response() {
        let body = message_response(&Reply::text("🔨 eve was banned."));
        assert_eq!(body["type"], 4);
        assert_eq!(body["data"]["content"], "🔨 eve was banned.");
        assert!(body["data"].get("flags").is_none());
    }
}
