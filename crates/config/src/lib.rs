//! Configuration loading, validation, and management for the prompt engine.
//!
//! Loads configuration from `~/.serene-pub/engine.toml` with environment
//! variable overrides. Validates all settings before the engine sees them.

use serde::{Deserialize, Serialize};
use serene_core::PromptFormat;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.serene-pub/engine.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Content inclusion scheduler tuning
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Relative weights of the four content kinds
    #[serde(default)]
    pub weights: ContentWeights,

    /// Token counter selection
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// Lore matching strategy selection
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Prompt format, template, and budget defaults
    #[serde(default)]
    pub prompt: PromptSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fraction of the token limit below which new lore may still be added
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,

    /// Newest messages always included first (tier 4)
    #[serde(default = "default_recent_message_window")]
    pub recent_message_window: usize,

    /// Trimming never goes below this many chat messages
    #[serde(default = "default_min_retained_messages")]
    pub min_retained_messages: usize,

    /// Safety cap on scheduler loop iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_batch_size_below")]
    pub batch_size_below: usize,

    #[serde(default = "default_batch_size_above")]
    pub batch_size_above: usize,

    #[serde(default = "default_batch_size_over")]
    pub batch_size_over: usize,

    /// Iterations between re-renders while below the threshold
    #[serde(default = "default_render_interval_below")]
    pub render_interval_below: usize,

    /// Iterations between re-renders while approaching the limit
    #[serde(default = "default_render_interval_above")]
    pub render_interval_above: usize,

    /// Iterations between re-renders while over the limit
    #[serde(default = "default_render_interval_over")]
    pub render_interval_over: usize,
}

fn default_threshold_percent() -> f64 {
    0.9
}
fn default_recent_message_window() -> usize {
    3
}
fn default_min_retained_messages() -> usize {
    1
}
fn default_max_iterations() -> usize {
    1000
}
fn default_batch_size_below() -> usize {
    3
}
fn default_batch_size_above() -> usize {
    1
}
fn default_batch_size_over() -> usize {
    1
}
fn default_render_interval_below() -> usize {
    2
}
fn default_render_interval_above() -> usize {
    4
}
fn default_render_interval_over() -> usize {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threshold_percent: default_threshold_percent(),
            recent_message_window: default_recent_message_window(),
            min_retained_messages: default_min_retained_messages(),
            max_iterations: default_max_iterations(),
            batch_size_below: default_batch_size_below(),
            batch_size_above: default_batch_size_above(),
            batch_size_over: default_batch_size_over(),
            render_interval_below: default_render_interval_below(),
            render_interval_above: default_render_interval_above(),
            render_interval_over: default_render_interval_over(),
        }
    }
}

/// Relative weights of the content kinds in the round-robin scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentWeights {
    #[serde(default = "default_chat_messages_weight")]
    pub chat_messages: f64,

    #[serde(default = "default_world_lore_weight")]
    pub world_lore: f64,

    #[serde(default = "default_character_lore_weight")]
    pub character_lore: f64,

    #[serde(default = "default_history_weight")]
    pub history: f64,
}

fn default_chat_messages_weight() -> f64 {
    1.0
}
fn default_world_lore_weight() -> f64 {
    0.6
}
fn default_character_lore_weight() -> f64 {
    0.8
}
fn default_history_weight() -> f64 {
    0.4
}

impl Default for ContentWeights {
    fn default() -> Self {
        Self {
            chat_messages: default_chat_messages_weight(),
            world_lore: default_world_lore_weight(),
            character_lore: default_character_lore_weight(),
            history: default_history_weight(),
        }
    }
}

impl ContentWeights {
    /// Weights in scheduler order: chat messages, world lore, character lore, history.
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.chat_messages,
            self.world_lore,
            self.character_lore,
            self.history,
        ]
    }

    /// Scale so the largest weight equals 1.0. All-zero weights become all-ones.
    pub fn normalized(&self) -> [f64; 4] {
        let raw = self.as_array().map(|w| w.max(0.0));
        let max = raw.iter().copied().fold(0.0_f64, f64::max);
        if max <= 0.0 {
            return [1.0; 4];
        }
        raw.map(|w| w / max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// `estimate`, `cl100k`, `o200k`, `p50k`, or `hf:<path>`
    #[serde(default = "default_tokenizer_name")]
    pub name: String,

    /// Local `tokenizer.json` used when `name` is `huggingface`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_file: Option<PathBuf>,
}

fn default_tokenizer_name() -> String {
    "estimate".into()
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            name: default_tokenizer_name(),
            tokenizer_file: None,
        }
    }
}

impl TokenizerConfig {
    /// The counter name handed to the registry, folding in `tokenizer_file`.
    pub fn counter_name(&self) -> String {
        match (&self.tokenizer_file, self.name.as_str()) {
            (Some(path), "huggingface" | "hf") => format!("hf:{}", path.display()),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// `keyword` or `vector`
    #[serde(default = "default_matching_strategy")]
    pub strategy: String,

    /// Minimum cosine similarity for the vector strategy
    #[serde(default = "default_vector_threshold")]
    pub vector_threshold: f32,
}

fn default_matching_strategy() -> String {
    "keyword".into()
}
fn default_vector_threshold() -> f32 {
    0.75
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strategy: default_matching_strategy(),
            vector_threshold: default_vector_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSection {
    #[serde(default)]
    pub format: PromptFormat,

    /// Custom template file; the built-in template is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,

    /// Default token limit
    #[serde(default = "default_context_tokens")]
    pub context_tokens: usize,

    /// Produce a role-tagged message list instead of flat text
    #[serde(default)]
    pub chat_style: bool,

    #[serde(default = "default_system_instructions")]
    pub system_instructions: String,
}

fn default_context_tokens() -> usize {
    4096
}
fn default_system_instructions() -> String {
    "You are {{char}}. Continue the roleplay with {{user}}. Stay in character, \
     write vivid prose, and never speak or act for {{user}}."
        .into()
}

impl Default for PromptSection {
    fn default() -> Self {
        Self {
            format: PromptFormat::default(),
            template_path: None,
            context_tokens: default_context_tokens(),
            chat_style: false,
            system_instructions: default_system_instructions(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path (~/.serene-pub/engine.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `SERENE_TOKENIZER`
    /// - `SERENE_CONTEXT_TOKENS`
    /// - `SERENE_PROMPT_FORMAT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("engine.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `SERENE_*` overrides read through `lookup`.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(name) = lookup("SERENE_TOKENIZER") {
            self.tokenizer.name = name;
        }

        if let Some(raw) = lookup("SERENE_CONTEXT_TOKENS") {
            self.prompt.context_tokens = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "SERENE_CONTEXT_TOKENS must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        if let Some(format) = lookup("SERENE_PROMPT_FORMAT") {
            self.prompt.format = PromptFormat::from_name(&format);
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".serene-pub")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if !(s.threshold_percent > 0.0 && s.threshold_percent <= 1.0) {
            return Err(ConfigError::ValidationError(
                "scheduler.threshold_percent must be in (0.0, 1.0]".into(),
            ));
        }

        let positive = [
            ("scheduler.recent_message_window", s.recent_message_window),
            ("scheduler.min_retained_messages", s.min_retained_messages),
            ("scheduler.max_iterations", s.max_iterations),
            ("scheduler.batch_size_below", s.batch_size_below),
            ("scheduler.batch_size_above", s.batch_size_above),
            ("scheduler.batch_size_over", s.batch_size_over),
            ("scheduler.render_interval_below", s.render_interval_below),
            ("scheduler.render_interval_above", s.render_interval_above),
            ("scheduler.render_interval_over", s.render_interval_over),
            ("prompt.context_tokens", self.prompt.context_tokens),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
        }

        let weights = self.weights.as_array();
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(ConfigError::ValidationError(
                "weights must be finite and non-negative".into(),
            ));
        }
        if weights.iter().all(|w| *w == 0.0) {
            return Err(ConfigError::ValidationError(
                "at least one content weight must be > 0".into(),
            ));
        }

        if !(-1.0..=1.0).contains(&self.matching.vector_threshold) {
            return Err(ConfigError::ValidationError(
                "matching.vector_threshold must be between -1.0 and 1.0".into(),
            ));
        }

        match self.matching.strategy.as_str() {
            "keyword" | "vector" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "matching.strategy must be 'keyword' or 'vector', got '{other}'"
                )));
            }
        }

        Ok(())
    }

    /// Read the custom template, if one is configured.
    pub fn load_template(&self) -> Result<Option<String>, ConfigError> {
        let Some(path) = &self.prompt.template_path else {
            return Ok(None);
        };
        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| ConfigError::ReadError {
                path: path.clone(),
                reason: e.to_string(),
            })
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
