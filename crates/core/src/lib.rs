//! # Serene Core
//!
//! Domain types, traits, and error definitions for the Serene Pub prompt
//! engine. This crate has **no engine logic**: it defines the domain model
//! that the prompt compiler and its front ends build against.
//!
//! ## Design Philosophy
//!
//! Every pluggable seam is defined as a trait here. Implementations live in
//! `serene-prompt`. This enables:
//! - Swapping token counters and matching strategies by name
//! - Easy testing with fake counters and embedders
//! - Clean dependency graph (all crates depend inward on core)

pub mod character;
pub mod chat;
pub mod compiled;
pub mod error;
pub mod lorebook;
pub mod matching;
pub mod message;
pub mod request;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use character::{Character, ChatCharacter, ChatPersona, Persona, Visibility};
pub use chat::ChatSnapshot;
pub use compiled::{
    CharacterSource, ChatMessageStats, CompiledPrompt, CompiledPromptMeta, LoreSourceStats,
    PersonaSource, PromptSources, ScenarioSource, TokenCounts, TruncationReason,
};
pub use error::{Error, MatchingError, Result, TemplateError, TokenizerError};
pub use lorebook::{
    EntryKey, HistoryEntry, KindedLore, LoreEntry, LoreKind, Lorebook, LorebookBinding,
    MatchableEntry, MAX_PRIORITY,
};
pub use matching::{Embedder, FailedMatches, LoreMatchingStrategy, MatchMessage};
pub use message::{ChatMessage, PromptMessage, Role};
pub use request::{ConnectionProfile, ContextConfig, PromptConfig, PromptFormat, SamplingConfig};
pub use token::TokenCounter;
