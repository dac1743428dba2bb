//! The variables a prompt template can see.
//!
//! Field names are camelCase in templates: `worldLore`, `chatMessages`,
//! `postHistoryInstructions`, and so on.

use serde::Serialize;
use serene_core::Role;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContext {
    pub instructions: String,
    pub scenario: Option<String>,
    pub characters: Vec<CharacterContext>,
    pub personas: Vec<PersonaContext>,
    pub world_lore: Vec<LoreContext>,
    pub character_lore: Vec<LoreContext>,
    pub history: Vec<HistoryContext>,
    pub chat_messages: Vec<MessageContext>,
    pub post_history_instructions: Option<String>,
    /// The open slot the model continues; absent for chat-style output
    pub placeholder: Option<PlaceholderContext>,
    /// Current character display name
    pub char: String,
    /// Current persona name
    pub user: String,
}

/// A character as rendered; minimal characters carry only names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterContext {
    pub name: String,
    pub nickname: Option<String>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub example_dialogue: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonaContext {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoreContext {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryContext {
    pub date: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageContext {
    pub id: i64,
    pub role: Role,
    /// Speaker display name
    pub name: String,
    /// Interpolated content
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceholderContext {
    pub role: Role,
    pub name: String,
}
