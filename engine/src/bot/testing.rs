//! In-memory chat fakes shared by the bot unit tests

use async_trait::async_trait;
use sdk::chat::{ChatError, ChatSurface, Moderator, Reply};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Records every call made against it
#[derive(Default)]
pub struct RecordingSurface {
    pub deferred: AtomicBool,
    pub replies: Mutex<Vec<Reply>>,
    pub edits: Mutex<Vec<Reply>>,
    pub follow_ups: Mutex<Vec<Reply>>,
    pub typing: AtomicUsize,
}

impl RecordingSurface {
    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<Reply> {
        self.edits.lock().unwrap().clone()
    }

    pub fn follow_ups(&self) -> Vec<Reply> {
        self.follow_ups.lock().unwrap().clone()
    }

    pub fn last_description(&self) -> String {
        self.edits().last().unwrap().embeds[0].description.clone()
    }

    pub fn typing_count(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }

    fn responded(&self) -> bool {
        self.deferred.load(Ordering::SeqCst) || !self.replies.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ChatSurface for RecordingSurface {
    async fn defer_reply(&self) -> Result<(), ChatError> {
        if self.responded() {
            return Err(ChatError::AlreadyResponded);
        }
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> Result<(), ChatError> {
        if self.responded() {
            return Err(ChatError::AlreadyResponded);
        }
        self.replies.lock().unwrap().push(reply);
        Ok(())
    }

    async fn edit_reply(&self, reply: Reply) -> Result<(), ChatError> {
        self.edits.lock().unwrap().push(reply);
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> Result<(), ChatError> {
        self.follow_ups.lock().unwrap().push(reply);
        Ok(())
    }

    async fn send_typing(&self) -> Result<(), ChatError> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Remembers ban and kick targets
#[derive(Default)]
pub struct RecordingModerator {
    pub banned: Mutex<Vec<(String, String)>>,
    pub kicked: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Moderator for RecordingModerator {
    async fn ban(&self, guild_id: &str, user_id: &str) -> Result<(), ChatError> {
        self.banned
            .lock()
            .unwrap()
            .push((guild_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn kick(&self, guild_id: &str, user_id: &str) -> Result<(), ChatError> {
        self.kicked
            .lock()
            .unwrap()
            .push((guild_id.to_string(), user_id.to_string()));
        Ok(())
    }
}
