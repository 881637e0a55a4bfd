//! Context Assembler
//!
//! Builds the prompt for one question: the user's retained turns as history,
//! then a new user turn made of the rolling summary, the question and an
//! optional image. When the estimated size approaches the model's context
//! window the user's memory is compacted first.

use std::sync::Arc;
use tracing::{info, warn};

use super::attachment::{Attachment, AttachmentFetcher};
use crate::llm::{Content, Part, Role};
use crate::memory::{estimate_sequence, estimate_tokens, Compactor, MemoryStore, UserMemory};

/// Upper bound on answer length
pub const MAX_OUTPUT_TOKENS: i64 = 4096;

/// Tokens held back from the output budget
pub const RESERVED_TOKENS: i64 = 1000;

/// Budget used when the window is already exhausted
pub const MIN_OUTPUT_TOKENS: i64 = 256;

/// Fraction of the context window that triggers compaction
const COMPACTION_THRESHOLD: f64 = 0.9;

/// Everything needed to open a model stream for one question
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    /// Prior turns, oldest first
    pub history: Vec<Content>,
    /// The new user turn
    pub turn: Content,
    pub estimated_tokens: usize,
    pub max_output_tokens: i64,
    /// Whether the image was fetched and included
    pub image_attached: bool,
}

impl AssembledPrompt {
    /// History followed by the new turn
    pub fn contents(&self) -> Vec<Content> {
        let mut contents = self.history.clone();
        contents.push(self.turn.clone());
        contents
    }
}

pub struct ContextAssembler {
    store: Arc<MemoryStore>,
    compactor: Arc<Compactor>,
    fetcher: Arc<dyn AttachmentFetcher>,
    context_limit: usize,
}

impl ContextAssembler {
    pub fn new(
        store: Arc<MemoryStore>,
        compactor: Arc<Compactor>,
        fetcher: Arc<dyn AttachmentFetcher>,
        context_limit: usize,
    ) -> Self {
        Self {
            store,
            compactor,
            fetcher,
            context_limit,
        }
    }

    /// Assemble the prompt for `question` asked by `user_id`
    pub async fn assemble(
        &self,
        user_id: &str,
        question: &str,
        image: Option<&Attachment>,
    ) -> AssembledPrompt {
        let mut memory = self.store.get_or_create(user_id);

        let image_part = match image {
            Some(attachment) => {
                let fetched = self
                    .fetcher
                    .fetch(&attachment.url, attachment.content_type.as_deref())
                    .await;
                if fetched.is_none() {
                    warn!("Continuing without image for user {}", user_id);
                }
                fetched.map(Part::inline)
            }
            None => None,
        };

        let mut estimated_tokens = estimate_memory(&memory, question);

        if estimated_tokens as f64 > self.context_limit as f64 * COMPACTION_THRESHOLD {
            info!(
                "Context nearing {} tokens for user {}, compressing",
                self.context_limit, user_id
            );
            self.compactor.compact(user_id).await;
            memory = self.store.get_or_create(user_id);
            estimated_tokens = estimate_memory(&memory, question);
        }

        let image_attached = image_part.is_some();
        let mut parts = Vec::with_capacity(3);
        if !memory.summary.is_empty() {
            parts.push(Part::text(format!("Summary:\n{}\n\n", memory.summary)));
        }
        parts.push(Part::text(question));
        parts.extend(image_part);

        AssembledPrompt {
            history: memory.history(),
            turn: Content::new(Role::User, parts),
            estimated_tokens,
            max_output_tokens: output_budget(self.context_limit, estimated_tokens),
            image_attached,
        }
    }
}

/// Summary, retained turns and question; images are not counted
fn estimate_memory(memory: &UserMemory, question: &str) -> usize {
    estimate_tokens(&memory.summary) + estimate_sequence(&memory.turns) + estimate_tokens(question)
}

/// `min(4096, limit - estimate - 1000)`, floored at [`MIN_OUTPUT_TOKENS`]
/// when that leaves nothing
pub fn output_budget(context_limit: usize, estimated_tokens: usize) -> i64 {
    let limit = i64::try_from(context_limit).unwrap_or(i64::MAX);
    let estimate = i64::try_from(estimated_tokens).unwrap_or(i64::MAX);
    let budget = limit
        .saturating_sub(estimate)
        .saturating_sub(RESERVED_TOKENS)
        .min(MAX_OUTPUT_TOKENS);

    if budget <= 0 {
        warn!(
            "Context window exhausted ({} of {} tokens), using minimum output budget",
            estimated_tokens, context_limit
        );
        MIN_OUTPUT_TOKENS
    } else {
        budget
    }
}
