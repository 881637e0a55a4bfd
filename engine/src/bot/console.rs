//! Terminal chat surface used by `fractonix ask`

use async_trait::async_trait;
use sdk::chat::{ChatError, ChatSurface, Reply};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Prints messages to stdout and keeps the latest edit
#[derive(Debug, Default)]
pub struct ConsoleSurface {
    last_edit: Mutex<Option<Reply>>,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent content of the edited reply
    pub fn last_edit(&self) -> Option<Reply> {
        self.last_edit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn print(reply: &Reply) {
        if let Some(content) = &reply.content {
            println!("{}", content);
        }
        for embed in &reply.embeds {
            println!("== {} ==\n{}", embed.title, embed.description);
        }
    }
}

#[async_trait]
impl ChatSurface for ConsoleSurface {
    async fn defer_reply(&self) -> Result<(), ChatError> {
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> Result<(), ChatError> {
        Self::print(&reply);
        Ok(())
    }

    async fn edit_reply(&self, reply: Reply) -> Result<(), ChatError> {
        if let Some(embed) = reply.embeds.first() {
            debug!("{}: {} chars", embed.title, embed.description.chars().count());
        }
        *self.last_edit.lock().unwrap_or_else(PoisonError::into_inner) = Some(reply);
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> Result<(), ChatError> {
        Self::print(&reply);
        Ok(())
    }

    async fn send_typing(&self) -> Result<(), ChatError> {
        Ok(())
    }
}
