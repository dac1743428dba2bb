//! Error types for the Serene Pub prompt engine.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all prompt compilation operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Caller configuration errors ---
    #[error("Current character {character_id} is not part of chat {chat_id}")]
    CurrentCharacterMissing { chat_id: i64, character_id: i64 },

    // --- Token counting errors ---
    #[error("Token counter error: {0}")]
    Tokenizer(#[from] TokenizerError),

    // --- Template errors ---
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    // --- Lore matching errors ---
    #[error("Matching error: {0}")]
    Matching(#[from] MatchingError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum TokenizerError {
    #[error("Unknown token counter: {0}")]
    Unknown(String),

    #[error("Token counter '{name}' is unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Failed to load tokenizer data: {0}")]
    LoadFailed(String),

    #[error("Failed to encode text: {0}")]
    EncodeFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    #[error("Template failed to parse: {0}")]
    Parse(String),

    #[error("Template failed to render: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Error)]
pub enum MatchingError {
    #[error("Matching strategy '{0}' used before initialize()")]
    NotInitialized(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Matching strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_character_displays_ids() {
        let err = Error::CurrentCharacterMissing {
            chat_id: 7,
            character_id: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("chat 7"));
    }

    #[test]
    fn tokenizer_error_converts() {
        let err: Error = TokenizerError::Unavailable {
            name: "cl100k".into(),
            reason: "feature disabled".into(),
        }
        .into();
        assert!(err.to_string().contains("cl100k"));
        assert!(matches!(err, Error::Tokenizer(_)));
    }

    #[test]
    fn matching_error_displays_strategy() {
        let err = Error::Matching(MatchingError::NotInitialized("vector".into()));
        assert!(err.to_string().contains("vector"));
        assert!(err.to_string().contains("initialize"));
    }
}
