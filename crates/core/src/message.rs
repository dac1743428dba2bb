//! Chat message domain types.
//!
//! Messages are owned by the external chat store and handed to the engine
//! as an ordered snapshot. The engine never mutates them; it only decides
//! which contiguous suffix of the history makes it into the prompt.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human player (speaking through a persona)
    User,
    /// A character played by the model
    Assistant,
    /// Narration or out-of-character instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Capitalized role label (`User`, `Assistant`, `System`).
    pub fn title(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A single message in a chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Stable, monotonically increasing message ID
    pub id: i64,

    /// Who sent this message
    pub role: Role,

    /// Raw content, before interpolation
    pub content: String,

    /// The character that spoke this message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<i64>,

    /// The persona that spoke this message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<i64>,
}

impl ChatMessage {
    /// Create a user message spoken through a persona.
    pub fn user(id: i64, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            character_id: None,
            persona_id: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(id: i64, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            character_id: None,
            persona_id: None,
        }
    }

    /// Create a system message.
    pub fn system(id: i64, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::System,
            content: content.into(),
            character_id: None,
            persona_id: None,
        }
    }

    pub fn with_character(mut self, character_id: i64) -> Self {
        self.character_id = Some(character_id);
        self
    }

    pub fn with_persona(mut self, persona_id: i64) -> Self {
        self.persona_id = Some(persona_id);
        self
    }
}

/// A role-tagged message in a compiled, chat-style prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
