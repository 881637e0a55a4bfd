//! The ask flow
//!
//! One question from one user: serialize against that user's other
//! requests, assemble the prompt, stream the model's answer into the chat
//! and remember the exchange.

use sdk::chat::ChatSurface;
use sdk::errors::BotError;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::renderer::StreamRenderer;
use crate::conductor::{Attachment, ContextAssembler};
use crate::llm::{GenerationConfig, LLMProvider};
use crate::memory::{MemoryStore, Turn, UserLocks};

/// Appended to the remembered question when an image was supplied
const IMAGE_MARKER: &str = " [with image]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub user_id: String,
    pub question: String,
    pub image: Option<Attachment>,
}

impl AskRequest {
    pub fn new(user_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            question: question.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Attachment) -> Self {
        self.image = Some(image);
        self
    }

    /// Text stored as the user's turn
    fn remembered_question(&self) -> String {
        match self.image {
            Some(_) => format!("{}{}", self.question, IMAGE_MARKER),
            None => self.question.clone(),
        }
    }
}

pub struct AskService {
    provider: Arc<dyn LLMProvider>,
    store: Arc<MemoryStore>,
    assembler: ContextAssembler,
    renderer: StreamRenderer,
    locks: UserLocks,
    temperature: f32,
}

impl AskService {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        store: Arc<MemoryStore>,
        assembler: ContextAssembler,
        renderer: StreamRenderer,
        temperature: f32,
    ) -> Self {
        Self {
            provider,
            store,
            assembler,
            renderer,
            locks: UserLocks::new(),
            temperature,
        }
    }

    /// Answer `request` on `surface` and return the rendered text
    #[instrument(name = "ask", skip_all, fields(user_id = %request.user_id))]
    pub async fn ask(
        &self,
        request: AskRequest,
        surface: Arc<dyn ChatSurface>,
    ) -> Result<String, BotError> {
        let _guard = self.locks.acquire(&request.user_id).await;

        surface.defer_reply().await?;

        let prompt = self
            .assembler
            .assemble(&request.user_id, &request.question, request.image.as_ref())
            .await;

        info!(
            "Asking {} (~{} tokens, budget {}{})",
            self.provider.name(),
            prompt.estimated_tokens,
            prompt.max_output_tokens,
            if prompt.image_attached { ", with image" } else { "" }
        );

        let config = GenerationConfig::new(prompt.max_output_tokens, self.temperature);
        let stream = self
            .provider
            .generate_stream(&prompt.contents(), config)
            .await?;

        let answer = self.renderer.render(surface, stream).await?;

        let question = request.remembered_question();
        let stored = self.store.update(&request.user_id, |memory| {
            memory.turns.push(Turn::user(question));
            memory.turns.push(Turn::model(answer.as_str()));
            memory.touch();
        });
        // The user already has the answer; a failed write only loses history
        if let Err(e) = stored {
            warn!("Failed to save memory for user {}: {}", request.user_id, e);
        }

        Ok(answer)
    }
}
