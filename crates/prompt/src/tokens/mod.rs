//! Token counter registry.
//!
//! Counters are resolved by name at runtime:
//!
//! | Name | Back-end | Feature |
//! |------|----------|---------|
//! | `estimate` | chars / 4 lower bound | always |
//! | `cl100k`, `gpt-4`, `gpt-3.5-turbo` | tiktoken `cl100k_base` | `tiktoken` |
//! | `o200k`, `gpt-4o` | tiktoken `o200k_base` | `tiktoken` |
//! | `p50k`, `gpt-3` | tiktoken `p50k_base` | `tiktoken` |
//! | `hf:<path>` | Hugging Face `tokenizer.json` | `huggingface` |
//!
//! A known back-end that was compiled out falls back to `estimate` with a
//! warning. Unknown names are an error.

pub mod estimate;
#[cfg(feature = "huggingface")]
pub mod huggingface;
#[cfg(feature = "tiktoken")]
pub mod tiktoken;

use std::sync::Arc;

use serene_core::{TokenCounter, TokenizerError};

pub use estimate::{EstimateCounter, estimate_tokens};

/// Names accepted by [`counter_by_name`], for help output.
pub const KNOWN_COUNTERS: &[&str] = &["estimate", "cl100k", "o200k", "p50k", "hf:<path>"];

/// BPE vocabularies shipped with tiktoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BpeEncoding {
    Cl100k,
    O200k,
    P50k,
}

impl BpeEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cl100k => "cl100k",
            Self::O200k => "o200k",
            Self::P50k => "p50k",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "cl100k" | "cl100k_base" | "gpt-4" | "gpt-3.5-turbo" => Some(Self::Cl100k),
            "o200k" | "o200k_base" | "gpt-4o" => Some(Self::O200k),
            "p50k" | "p50k_base" | "gpt-3" => Some(Self::P50k),
            _ => None,
        }
    }
}

/// Resolve a token counter by name.
pub fn counter_by_name(name: &str) -> Result<Arc<dyn TokenCounter>, TokenizerError> {
    let normalized = name.trim().to_lowercase();

    if normalized.is_empty() || normalized == "estimate" {
        return Ok(Arc::new(EstimateCounter));
    }

    if let Some(encoding) = BpeEncoding::from_name(&normalized) {
        return bpe_counter(encoding);
    }

    if let Some(path) = name.trim().strip_prefix("hf:") {
        return huggingface_counter(path);
    }

    Err(TokenizerError::Unknown(name.to_string()))
}

#[cfg(feature = "tiktoken")]
fn bpe_counter(encoding: BpeEncoding) -> Result<Arc<dyn TokenCounter>, TokenizerError> {
    Ok(Arc::new(tiktoken::TiktokenCounter::new(encoding)?))
}

#[cfg(not(feature = "tiktoken"))]
fn bpe_counter(encoding: BpeEncoding) -> Result<Arc<dyn TokenCounter>, TokenizerError> {
    tracing::warn!(
        counter = encoding.as_str(),
        "Built without the 'tiktoken' feature, falling back to estimate"
    );
    Ok(Arc::new(EstimateCounter))
}

#[cfg(feature = "huggingface")]
fn huggingface_counter(path: &str) -> Result<Arc<dyn TokenCounter>, TokenizerError> {
    Ok(Arc::new(huggingface::HuggingFaceCounter::from_file(path)?))
}

#[cfg(not(feature = "huggingface"))]
fn huggingface_counter(path: &str) -> Result<Arc<dyn TokenCounter>, TokenizerError> {
    tracing::warn!(
        tokenizer_file = path,
        "Built without the 'huggingface' feature, falling back to estimate"
    );
    Ok(Arc::new(EstimateCounter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_resolves_by_default() {
        assert_eq!(counter_by_name("").unwrap().name(), "estimate");
        assert_eq!(counter_by_name("Estimate").unwrap().name(), "estimate");
    }

    #[test]
    fn unknown_counter_is_an_error() {
        let err = counter_by_name("abacus").err().unwrap();
        assert!(matches!(err, TokenizerError::Unknown(ref n) if n == "abacus"));
    }

    #[test]
    fn model_aliases_map_to_encodings() {
        assert_eq!(BpeEncoding::from_name("gpt-4o"), Some(BpeEncoding::O200k));
        assert_eq!(BpeEncoding::from_name("gpt-4"), Some(BpeEncoding::Cl100k));
        assert_eq!(BpeEncoding::from_name("gpt-3"), Some(BpeEncoding::P50k));
        assert_eq!(BpeEncoding::from_name("llama"), None);
    }

    #[cfg(not(feature = "huggingface"))]
    #[test]
    fn compiled_out_backend_falls_back() {
        let counter = counter_by_name("hf:/models/tokenizer.json").unwrap();
        assert_eq!(counter.name(), "estimate");
    }
}
