//! Character and persona profiles.
//!
//! A *character* is played by the model; a *persona* is the mask the human
//! player speaks through. Both are attached to a chat with per-chat settings.

use serde::{Deserialize, Serialize};

/// How much of a character the prompt exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Full profile: description, personality, example dialogue, lore
    #[default]
    Visible,
    /// Name and nickname only; no lore
    Minimal,
    /// Not mentioned at all
    Hidden,
}

/// A character profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Character {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Alternative example dialogues; one is picked per compile
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub example_dialogues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_history_instructions: Option<String>,
}

impl Character {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// The name used when the character speaks: nickname wins over name.
    pub fn display_name(&self) -> &str {
        match self.nickname.as_deref() {
            Some(nick) if !nick.trim().is_empty() => nick,
            _ => &self.name,
        }
    }
}

/// A persona profile (the player's side of the conversation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Persona {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Persona {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
        }
    }
}

/// A character as attached to one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCharacter {
    pub character: Character,
    #[serde(default)]
    pub visibility: Visibility,
}

impl ChatCharacter {
    pub fn visible(character: Character) -> Self {
        Self {
            character,
            visibility: Visibility::Visible,
        }
    }

    pub fn with_visibility(character: Character, visibility: Visibility) -> Self {
        Self {
            character,
            visibility,
        }
    }
}

/// A persona as attached to one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPersona {
    pub persona: Persona,
}
