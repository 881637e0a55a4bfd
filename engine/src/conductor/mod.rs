//! Prompt assembly
//!
//! Turns a user's stored memory, a question and an optional image into the
//! content sequence sent to the model.

pub mod attachment;
pub mod context;

pub use attachment::{Attachment, AttachmentFetcher, HttpAttachmentFetcher, DEFAULT_IMAGE_MIME};
pub use context::{output_budget, AssembledPrompt, ContextAssembler, MIN_OUTPUT_TOKENS};
