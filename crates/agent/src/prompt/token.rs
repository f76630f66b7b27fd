//! Token estimation.
//!
//! Uses a character-based heuristic: ~4 characters per token.
//! This approximation is accurate within ~10% for BPE tokenizers
//! (GPT-3.5, GPT-4) on English text, which is enough to keep a prompt
//! under its budget with the reply reserve on top.

use orchestra_core::provider::TokenCounter;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// [`TokenCounter`] backed by [`estimate_tokens`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenCounter;

impl TokenCounter for CharTokenCounter {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}
