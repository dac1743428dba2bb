//! Token counter trait: the abstraction over tokenizers.
//!
//! The engine only ever asks "how many tokens is this text?". Whether the
//! answer comes from a heuristic or a real BPE vocabulary is an
//! implementation detail selected by name at runtime.

use async_trait::async_trait;

use crate::error::TokenizerError;

#[async_trait]
pub trait TokenCounter: Send + Sync {
    /// Registry name of this counter (`estimate`, `cl100k`, ...).
    fn name(&self) -> &str;

    /// Count the tokens in `text`.
    async fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;
}
