//! Conversation memory
//!
//! Per-user rolling summary plus recent turns, the character-based token
//! estimator that decides when history is getting large, and the compactor
//! that folds old turns into the summary.

pub mod compactor;
pub mod locks;
pub mod store;
pub mod tokens;

pub use compactor::{CompactionOutcome, Compactor, COMPACTION_MIN_TURNS, RETAINED_TURNS};
pub use locks::{UserGuard, UserLocks};
pub use store::{MemoryMap, MemoryStore, Turn, UserMemory};
pub use tokens::{estimate_sequence, estimate_tokens, TextBlock};
