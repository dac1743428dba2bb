//! Character-based token estimate.
//!
//! Heuristic: 1 token ≈ 4 characters, rounded DOWN. Real BPE tokenizers
//! average fewer than four characters per token on prose, so this is a
//! lower bound: it may under-count but never claims more tokens than a
//! precise tokenizer would.

use async_trait::async_trait;
use serene_core::{TokenCounter, TokenizerError};

const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// The always-available lower-bound counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateCounter;

#[async_trait]
impl TokenCounter for EstimateCounter {
    fn name(&self) -> &str {
        "estimate"
    }

    async fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(estimate_tokens(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn partial_tokens_round_down() {
        assert_eq!(estimate_tokens("hello"), 1);
        assert_eq!(estimate_tokens("abc"), 0);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 4 chars, 12 bytes
        assert_eq!(estimate_tokens("日本語字"), 1);
    }

    #[test]
    fn hundred_chars() {
        let text = "a".repeat(100);
        assert_eq!(estimate_tokens(&text), 25);
    }

    #[tokio::test]
    async fn counter_matches_function() {
        let text = "The dragon circles the keep.";
        let counted = EstimateCounter.count_tokens(text).await.unwrap();
        assert_eq!(counted, estimate_tokens(text));
    }
}
