//! tiktoken BPE counters.
//!
//! The vocabularies are large, so each one is built once per process on
//! first use and shared read-only afterwards.

use std::sync::OnceLock;

use async_trait::async_trait;
use serene_core::{TokenCounter, TokenizerError};
use tiktoken_rs::CoreBPE;

use super::BpeEncoding;

static CL100K: OnceLock<Result<CoreBPE, String>> = OnceLock::new();
static O200K: OnceLock<Result<CoreBPE, String>> = OnceLock::new();
static P50K: OnceLock<Result<CoreBPE, String>> = OnceLock::new();

fn shared_bpe(encoding: BpeEncoding) -> Result<&'static CoreBPE, TokenizerError> {
    let cell = match encoding {
        BpeEncoding::Cl100k => &CL100K,
        BpeEncoding::O200k => &O200K,
        BpeEncoding::P50k => &P50K,
    };
    cell.get_or_init(|| {
        tracing::debug!(encoding = encoding.as_str(), "Loading BPE vocabulary");
        let loaded = match encoding {
            BpeEncoding::Cl100k => tiktoken_rs::cl100k_base(),
            BpeEncoding::O200k => tiktoken_rs::o200k_base(),
            BpeEncoding::P50k => tiktoken_rs::p50k_base(),
        };
        loaded.map_err(|e| e.to_string())
    })
    .as_ref()
    .map_err(|e| TokenizerError::LoadFailed(format!("{}: {e}", encoding.as_str())))
}

/// Counts tokens with one of the tiktoken vocabularies.
pub struct TiktokenCounter {
    encoding: BpeEncoding,
    bpe: &'static CoreBPE,
}

impl TiktokenCounter {
    pub fn new(encoding: BpeEncoding) -> Result<Self, TokenizerError> {
        Ok(Self {
            encoding,
            bpe: shared_bpe(encoding)?,
        })
    }
}

#[async_trait]
impl TokenCounter for TiktokenCounter {
    fn name(&self) -> &str {
        self.encoding.as_str()
    }

    async fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.bpe.encode_ordinary(text).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cl100k_counts_simple_text() {
        let counter = TiktokenCounter::new(BpeEncoding::Cl100k).unwrap();
        assert_eq!(counter.count_tokens("").await.unwrap(), 0);
        assert_eq!(counter.count_tokens("hello world").await.unwrap(), 2);
    }

    #[test]
    fn vocabulary_is_shared() {
        let a = TiktokenCounter::new(BpeEncoding::O200k).unwrap();
        let b = TiktokenCounter::new(BpeEncoding::O200k).unwrap();
        assert!(std::ptr::eq(a.bpe, b.bpe));
    }
}
