//! [`ChatSurface`] over one Discord interaction

use async_trait::async_trait;
use sdk::chat::{ChatError, ChatSurface, Reply};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::interaction::{deferred_response, message_response};
use super::rest::DiscordRest;

/// Answers a single interaction
///
/// The initial response travels back through the pending HTTP request via
/// a oneshot channel. Everything after that goes through the webhook REST
/// endpoints.
pub struct InteractionSurface {
    rest: Arc<DiscordRest>,
    token: String,
    channel_id: Option<String>,
    initial: Mutex<Option<oneshot::Sender<Value>>>,
}

/// How the initial response was delivered
enum Initial {
    /// Returned as the HTTP body
    Sent,
    /// The server already answered with a deferral
    TimedOut,
}

impl InteractionSurface {
    pub fn new(
        rest: Arc<DiscordRest>,
        token: impl Into<String>,
        channel_id: Option<String>,
        initial: oneshot::Sender<Value>,
    ) -> Self {
        Self {
            rest,
            token: token.into(),
            channel_id,
            initial: Mutex::new(Some(initial)),
        }
    }

    fn send_initial(&self, body: Value) -> Result<Initial, ChatError> {
        let sender = self
            .initial
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ChatError::AlreadyResponded)?;
        Ok(match sender.send(body) {
            Ok(()) => Initial::Sent,
            Err(_) => Initial::TimedOut,
        })
    }
}

#[async_trait]
impl ChatSurface for InteractionSurface {
    async fn defer_reply(&self) -> Result<(), ChatError> {
        self.send_initial(deferred_response())?;
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> Result<(), ChatError> {
        match self.send_initial(message_response(&reply))? {
            Initial::Sent => Ok(()),
            // The deferred placeholder is public; only a follow-up can stay ephemeral
            Initial::TimedOut if reply.ephemeral => {
                debug!("Initial response window missed, sending ephemeral follow-up");
                self.follow_up(reply).await
            }
            Initial::TimedOut => {
                debug!("Initial response window missed, editing deferred reply");
                self.rest.edit_original(&self.token, &reply).await
            }
        }
    }

    async fn edit_reply(&self, reply: Reply) -> Result<(), ChatError> {
        self.rest.edit_original(&self.token, &reply).await
    }

    async fn follow_up(&self, reply: Reply) -> Result<(), ChatError> {
        let err = match self.rest.create_followup(&self.token, &reply).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        // Interaction tokens expire after 15 minutes; post to the channel instead
        match &self.channel_id {
            Some(channel_id) if self.rest.has_bot_token() => {
                warn!("Follow-up failed ({}), posting to channel instead", err);
                self.rest.create_message(channel_id, &reply).await
            }
            _ => Err(err),
        }
    }

    async fn send_typing(&self) -> Result<(), ChatError> {
        let channel_id = self
            .channel_id
            .as_deref()
            .ok_or(ChatError::Unsupported("typing outside a channel"))?;
        self.rest.trigger_typing(channel_id).await
    }
}
