//! Chat snapshot: everything the engine reads about one chat.

use crate::character::{Character, ChatCharacter, ChatPersona, Persona, Visibility};
use crate::lorebook::Lorebook;
use crate::message::ChatMessage;
use serde::{Deserialize, Serialize};

/// An immutable view of a chat, taken by the caller before compiling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSnapshot {
    pub id: i64,
    pub name: String,
    /// Chat-level scenario; overrides any character scenario
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Ordered oldest → newest
    pub messages: Vec<ChatMessage>,
    pub characters: Vec<ChatCharacter>,
    pub personas: Vec<ChatPersona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lorebook: Option<Lorebook>,
}

impl ChatSnapshot {
    /// A chat with more than one character attached.
    pub fn is_group(&self) -> bool {
        self.characters.len() > 1
    }

    pub fn chat_character(&self, id: i64) -> Option<&ChatCharacter> {
        self.characters.iter().find(|cc| cc.character.id == id)
    }

    pub fn character(&self, id: i64) -> Option<&Character> {
        self.chat_character(id).map(|cc| &cc.character)
    }

    pub fn persona(&self, id: i64) -> Option<&Persona> {
        self.personas
            .iter()
            .map(|cp| &cp.persona)
            .find(|p| p.id == id)
    }

    /// Visibility of a character in this chat; unknown characters are hidden.
    pub fn visibility_of(&self, id: i64) -> Visibility {
        self.chat_character(id)
            .map(|cc| cc.visibility)
            .unwrap_or(Visibility::Hidden)
    }

    pub fn message_ids(&self) -> Vec<i64> {
        self.messages.iter().map(|m| m.id).collect()
    }
}
