//! Streaming Renderer
//!
//! Progressively mirrors a model stream into a single chat message. The
//! reply is edited at most once per [`EDIT_INTERVAL`] while text arrives,
//! a typing indicator is kept alive in the background, and the finished
//! answer is either shown inline or attached as a text file when it does
//! not fit in an embed.

use futures::StreamExt;
use sdk::chat::{ChatError, ChatSurface, Color, Embed, FileAttachment, Reply};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, warn};

use crate::llm::TextStream;

/// Period of the typing indicator
pub const TYPING_INTERVAL: Duration = Duration::from_millis(1400);

/// Minimum spacing between preview edits
pub const EDIT_INTERVAL: Duration = Duration::from_millis(1600);

/// Longest preview shown while streaming
pub const PREVIEW_LIMIT: usize = 4000;

/// Longest answer shown inline in the final embed
pub const DISPLAY_LIMIT: usize = 4096;

pub const THINKING_PLACEHOLDER: &str = "_Thinking..._";
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "_(no response text)_";
pub const OVERFLOW_NOTICE: &str = "Response too long — see attached text file.";
pub const OVERFLOW_FILE_NAME: &str = "fractonix.txt";

/// Renders model streams under a fixed embed title
#[derive(Debug, Clone)]
pub struct StreamRenderer {
    title: String,
}

impl StreamRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Drive `stream` to completion, editing the reply on `surface`
    ///
    /// Returns the text shown to the user, which is the placeholder when the
    /// model produced nothing. A stream error ends rendering early but keeps
    /// whatever text already arrived.
    pub async fn render(
        &self,
        surface: Arc<dyn ChatSurface>,
        mut stream: TextStream,
    ) -> Result<String, ChatError> {
        surface
            .edit_reply(Reply::embed(self.embed().description(THINKING_PLACEHOLDER)))
            .await?;

        let heartbeat = Heartbeat::start(Arc::clone(&surface), TYPING_INTERVAL);
        let mut session = StreamSession::default();

        while let Some(item) = stream.next().await {
            let delta = match item {
                Ok(delta) => delta,
                Err(e) => {
                    warn!("Streaming error: {}", e);
                    break;
                }
            };
            if delta.is_empty() {
                continue;
            }
            session.buffer.push_str(&delta);

            let now = Instant::now();
            if session.edit_due(now) {
                let preview = Embed::new(format!("{} (responding...)", self.title))
                    .color(Color::Blue)
                    .description(session.preview());
                if let Err(e) = surface.edit_reply(Reply::embed(preview)).await {
                    warn!("Failed to update streaming preview: {}", e);
                }
                session.last_edit = Some(now);
            }
        }

        drop(heartbeat);

        let final_text = session.finish();
        let done = self.embed().color(Color::Green);
        let reply = if final_text.chars().count() <= DISPLAY_LIMIT {
            Reply::embed(done.description(final_text.as_str()))
        } else {
            Reply::embed(done.description(OVERFLOW_NOTICE)).with_file(FileAttachment::text(
                OVERFLOW_FILE_NAME,
                "Full response",
                &final_text,
            ))
        };
        surface.edit_reply(reply).await?;

        debug!("Rendered {} chars", final_text.chars().count());
        Ok(final_text)
    }

    fn embed(&self) -> Embed {
        Embed::new(self.title.as_str()).color(Color::Blue)
    }
}

/// Per-invocation streaming state
#[derive(Debug, Default)]
struct StreamSession {
    buffer: String,
    last_edit: Option<Instant>,
}

impl StreamSession {
    fn edit_due(&self, now: Instant) -> bool {
        self.last_edit
            .map_or(true, |last| now.duration_since(last) > EDIT_INTERVAL)
    }

    fn preview(&self) -> String {
        if self.buffer.trim().is_empty() {
            THINKING_PLACEHOLDER.to_string()
        } else {
            within_limit(&self.buffer, PREVIEW_LIMIT)
        }
    }

    fn finish(self) -> String {
        if self.buffer.trim().is_empty() {
            EMPTY_RESPONSE_PLACEHOLDER.to_string()
        } else {
            self.buffer
        }
    }
}

/// Truncate to `limit` chars, marking the cut with an ellipsis
fn within_limit(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Repeating typing indicator, stopped when dropped
struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    fn start(surface: Arc<dyn ChatSurface>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if let Err(e) = surface.send_typing().await {
                    debug!("Typing indicator failed: {}", e);
                }
            }
        });
        Self { handle }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
