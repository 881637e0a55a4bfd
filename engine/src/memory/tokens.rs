//! Token estimation
//!
//! A cheap character-based approximation (1 token ≈ 4 characters). It only
//! gates the soft compaction threshold and the output budget, so it trades
//! accuracy for never calling the model.

use crate::llm::Part;

use super::store::Turn;

/// Average characters per token
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token cost of a piece of text
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Anything that may carry text for the estimator
pub trait TextBlock {
    fn block_text(&self) -> Option<&str>;
}

impl TextBlock for Turn {
    fn block_text(&self) -> Option<&str> {
        Some(&self.text)
    }
}

impl TextBlock for Part {
    fn block_text(&self) -> Option<&str> {
        self.as_text()
    }
}

/// Sum of the per-block estimates; blocks without text cost nothing
pub fn estimate_sequence<'a, T, I>(blocks: I) -> usize
where
    T: TextBlock + 'a,
    I: IntoIterator<Item = &'a T>,
{
    blocks
        .into_iter()
        .map(|b| b.block_text().map(estimate_tokens).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::InlineData;

    #[test]
    fn test_empty_text_is_free() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_rounds_up() {
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("What is 2+2?"), 3);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 4 characters, 8+ bytes
        assert_eq!(estimate_tokens("日本語だ"), 1);
    }

    #[test]
    fn test_sequence_sums_blocks() {
        let turns = vec![Turn::user("abcdefgh"), Turn::model("abc"), Turn::model("")];
        assert_eq!(estimate_sequence(&turns), 2 + 1);
    }

    #[test]
    fn test_empty_sequence() {
        let turns: Vec<Turn> = Vec::new();
        assert_eq!(estimate_sequence(&turns), 0);
    }

    #[test]
    fn test_inline_data_has_no_text_cost() {
        let parts = vec![
            Part::text("abcd"),
            Part::inline(InlineData {
                mime_type: "image/png".to_string(),
                data: "A".repeat(4000),
            }),
        ];
        assert_eq!(estimate_sequence(&parts), 1);
    }
}
