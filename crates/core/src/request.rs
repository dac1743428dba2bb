//! Request descriptors handed to the engine alongside a chat snapshot.
//!
//! These mirror what the external connection, sampling, context and prompt
//! stores hold; the engine only reads them.

use serde::{Deserialize, Deserializer, Serialize};

/// The fixed text markup wrapping each role's content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFormat {
    #[default]
    #[serde(rename = "chatml")]
    ChatMl,
    Basic,
    Vicuna,
    #[serde(rename = "openai")]
    OpenAi,
    Llama2Instruct,
    Claude,
    Instruct,
    SplitChat,
}

impl PromptFormat {
    pub const ALL: [PromptFormat; 8] = [
        Self::ChatMl,
        Self::Basic,
        Self::Vicuna,
        Self::OpenAi,
        Self::Llama2Instruct,
        Self::Claude,
        Self::Instruct,
        Self::SplitChat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatMl => "chatml",
            Self::Basic => "basic",
            Self::Vicuna => "vicuna",
            Self::OpenAi => "openai",
            Self::Llama2Instruct => "llama2_instruct",
            Self::Claude => "claude",
            Self::Instruct => "instruct",
            Self::SplitChat => "split_chat",
        }
    }

    /// Resolve a format name. Unknown names fall back to ChatML.
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "chatml" => Self::ChatMl,
            "basic" => Self::Basic,
            "vicuna" => Self::Vicuna,
            "openai" => Self::OpenAi,
            "llama2instruct" | "llama2" => Self::Llama2Instruct,
            "claude" => Self::Claude,
            "instruct" | "alpaca" => Self::Instruct,
            "splitchat" => Self::SplitChat,
            _ => {
                tracing::warn!(format = %name, "Unknown prompt format, falling back to ChatML");
                Self::ChatMl
            }
        }
    }
}

impl<'de> Deserialize<'de> for PromptFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

impl std::fmt::Display for PromptFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the downstream model connection expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionProfile {
    /// Pins the block format; falls back to the context config's format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_format: Option<PromptFormat>,
    /// Chat-completion style backends take a role-tagged message list
    pub chat_style: bool,
    /// Token counter name, see `serene_prompt::tokens::counter_by_name`
    pub tokenizer: String,
}

impl Default for ConnectionProfile {
    fn default() -> Self {
        Self {
            prompt_format: None,
            chat_style: false,
            tokenizer: "estimate".into(),
        }
    }
}

/// Sampling settings that bound the prompt size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    /// Hard ceiling on rendered prompt tokens
    pub context_tokens: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            context_tokens: 4096,
        }
    }
}

/// The prompt template and its default block format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextConfig {
    /// Template source; `None` selects the built-in template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Used when the connection does not pin a format
    pub format: PromptFormat,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            template: None,
            format: PromptFormat::ChatMl,
        }
    }
}

/// System instructions placed at the top of the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptConfig {
    pub system_instructions: String,
}
