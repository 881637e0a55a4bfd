//! LLM-based memory compaction
//!
//! Once a user has accumulated enough turns, the older exchanges are folded
//! into the rolling summary by asking the model for a short digest, and only
//! the most recent turns are kept verbatim. Compaction is best-effort: a
//! failed summarization leaves memory exactly as it was.

use std::sync::Arc;
use tracing::{info, warn};

use super::store::{MemoryStore, Turn};
use crate::llm::{Content, GenerationConfig, LLMProvider, Role};

/// Fewer turns than this are never compacted
pub const COMPACTION_MIN_TURNS: usize = 4;

/// Turns kept verbatim after compaction
pub const RETAINED_TURNS: usize = 2;

const SUMMARY_MAX_OUTPUT_TOKENS: i64 = 300;
const SUMMARY_TEMPERATURE: f32 = 0.4;

const SUMMARY_INSTRUCTION: &str =
    "Summarize this chat into the key facts, goals, and ideas in under 150 words:";

/// Result of a compaction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// Not enough turns to be worth summarizing
    Skipped,
    /// Older turns were folded into the summary
    Compacted {
        /// Number of turns removed from the verbatim history
        turns_removed: usize,
    },
    /// The model call failed or returned nothing; memory untouched
    Failed,
}

pub struct Compactor {
    provider: Arc<dyn LLMProvider>,
    store: Arc<MemoryStore>,
}

impl Compactor {
    pub fn new(provider: Arc<dyn LLMProvider>, store: Arc<MemoryStore>) -> Self {
        Self { provider, store }
    }

    /// Summarize and truncate `user_id`'s history if it is long enough
    pub async fn compact(&self, user_id: &str) -> CompactionOutcome {
        let memory = self.store.get_or_create(user_id);
        if memory.turns.len() < COMPACTION_MIN_TURNS {
            return CompactionOutcome::Skipped;
        }

        let prompt = summary_prompt(&memory.turns);
        let config = GenerationConfig::new(SUMMARY_MAX_OUTPUT_TOKENS, SUMMARY_TEMPERATURE);

        let summary = match self
            .provider
            .generate(&[Content::text(Role::User, prompt)], config)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Compression failed for user {}: {}", user_id, e);
                return CompactionOutcome::Failed;
            }
        };

        if summary.is_empty() {
            warn!("Compression for user {} returned an empty summary", user_id);
            return CompactionOutcome::Failed;
        }

        let updated = self.store.update(user_id, |mem| {
            mem.summary = format!("{}\n{}", mem.summary, summary).trim().to_string();
            let turns_removed = mem.turns.len().saturating_sub(RETAINED_TURNS);
            mem.turns.drain(..turns_removed);
            mem.touch();
            turns_removed
        });

        match updated {
            Ok(turns_removed) => {
                info!("Compressed memory for user {}", user_id);
                CompactionOutcome::Compacted { turns_removed }
            }
            Err(e) => {
                // Applied in memory; the next successful persist records it
                warn!("Compressed memory for user {} but could not persist: {}", user_id, e);
                CompactionOutcome::Compacted {
                    turns_removed: memory.turns.len().saturating_sub(RETAINED_TURNS),
                }
            }
        }
    }
}

/// `ROLE: text` lines under the summarization instruction
fn summary_prompt(turns: &[Turn]) -> String {
    let dump = turns
        .iter()
        .map(|t| format!("{}: {}", t.role.to_string().to_uppercase(), t.text))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}", SUMMARY_INSTRUCTION, dump)
}
