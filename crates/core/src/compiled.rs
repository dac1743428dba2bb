//! The compiled prompt and its provenance metadata.

use crate::character::Visibility;
use crate::message::PromptMessage;
use crate::request::PromptFormat;
use serde::{Deserialize, Serialize};

/// The output of one compile call.
///
/// Exactly one of `prompt` (text-completion backends) or `messages`
/// (chat-completion backends) is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPrompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<PromptMessage>>,
    pub meta: CompiledPromptMeta,
}

/// Token accounting, inclusion sets, and source attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPromptMeta {
    pub token_counts: TokenCounts,
    pub chat_messages: ChatMessageStats,
    pub sources: PromptSources,
    pub prompt_format: PromptFormat,
    pub truncation_reason: Option<TruncationReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub total: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageStats {
    pub included: usize,
    pub total: usize,
    /// Ascending; always a contiguous suffix of the chat's message ids
    pub included_ids: Vec<i64>,
    /// Ascending; the complement of `included_ids`
    pub excluded_ids: Vec<i64>,
}

/// Where the static and dynamic content came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSources {
    pub characters: Vec<CharacterSource>,
    pub personas: Vec<PersonaSource>,
    pub scenario: Option<ScenarioSource>,
    pub world_lore: LoreSourceStats,
    pub character_lore: LoreSourceStats,
    pub history: LoreSourceStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSource {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Effective visibility after the current-turn override
    pub visibility: Visibility,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSource {
    pub id: i64,
    pub name: String,
    pub is_current: bool,
}

/// Provenance of the active scenario text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioSource {
    Chat,
    Character,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoreSourceStats {
    pub included_ids: Vec<i64>,
    pub total: usize,
}

/// Why content was dropped for budget reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    /// Older messages did not fit the token limit
    TokenLimit,
    /// Even the minimum retained content exceeds the limit
    MinimumContentExceeded,
    /// The iteration safety cap stopped assembly early
    IterationLimit,
}

impl TruncationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenLimit => "token_limit",
            Self::MinimumContentExceeded => "minimum_content_exceeded",
            Self::IterationLimit => "iteration_limit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_reason_wire_names() {
        let json = serde_json::to_string(&TruncationReason::TokenLimit).unwrap();
        assert_eq!(json, "\"token_limit\"");
        assert_eq!(TruncationReason::IterationLimit.as_str(), "iteration_limit");
    }

    #[test]
    fn scenario_source_wire_names() {
        assert_eq!(
            serde_json::to_string(&ScenarioSource::Chat).unwrap(),
            "\"chat\""
        );
        assert_eq!(
            serde_json::to_string(&ScenarioSource::Character).unwrap(),
            "\"character\""
        );
    }

    #[test]
    fn compiled_prompt_omits_absent_body() {
        let compiled = CompiledPrompt {
            prompt: Some("hi".into()),
            messages: None,
            meta: CompiledPromptMeta {
                token_counts: TokenCounts { total: 1, limit: 10 },
                chat_messages: ChatMessageStats {
                    included: 0,
                    total: 0,
                    included_ids: vec![],
                    excluded_ids: vec![],
                },
                sources: PromptSources {
                    characters: vec![],
                    personas: vec![],
                    scenario: None,
                    world_lore: LoreSourceStats::default(),
                    character_lore: LoreSourceStats::default(),
                    history: LoreSourceStats::default(),
                },
                prompt_format: PromptFormat::ChatMl,
                truncation_reason: None,
            },
        };
        let json = serde_json::to_value(&compiled).unwrap();
        assert!(json.get("messages").is_none());
        assert_eq!(json["meta"]["tokenCounts"]["limit"], 10);
        assert!(json["meta"]["truncationReason"].is_null());
        assert_eq!(json["meta"]["promptFormat"], "chatml");
    }
}
