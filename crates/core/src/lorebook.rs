//! Lorebook domain types: world lore, character lore, history, bindings.
//!
//! Lore and history entries are injected into the prompt when one of their
//! comma-separated keys matches recent conversation, or unconditionally when
//! flagged `constant`.

use serde::{Deserialize, Serialize};

/// Highest priority tier. Tier-4 content is always included first.
pub const MAX_PRIORITY: u8 = 4;

/// Which kind of lorebook content an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoreKind {
    WorldLore,
    CharacterLore,
    History,
}

impl LoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorldLore => "world_lore",
            Self::CharacterLore => "character_lore",
            Self::History => "history",
        }
    }
}

/// Identifies an entry across the three lorebook collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub kind: LoreKind,
    pub id: i64,
}

impl EntryKey {
    pub fn new(kind: LoreKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

fn default_true() -> bool {
    true
}

/// A world-lore or character-lore entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoreEntry {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Comma-separated match keys
    #[serde(default)]
    pub keys: String,
    pub content: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub use_regex: bool,
    /// Priority tier 0–4 (ignored when `constant`)
    #[serde(default)]
    pub priority: u8,
    /// Always included, regardless of key matches
    #[serde(default)]
    pub constant: bool,
    /// Stable ordering within a tier
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Character-lore only: the binding this entry belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lorebook_binding_id: Option<i64>,
}

impl LoreEntry {
    pub fn new(id: i64, keys: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            keys: keys.into(),
            content: content.into(),
            case_sensitive: false,
            use_regex: false,
            priority: 2,
            constant: false,
            position: 0,
            enabled: true,
            lorebook_binding_id: None,
        }
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    pub fn bound_to(mut self, binding_id: i64) -> Self {
        self.lorebook_binding_id = Some(binding_id);
        self
    }
}

/// A dated history entry (the chronicle of the world).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(default)]
    pub keys: String,
    pub content: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub constant: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i32>,
}

impl HistoryEntry {
    pub fn new(id: i64, keys: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            keys: keys.into(),
            content: content.into(),
            case_sensitive: false,
            use_regex: false,
            priority: 2,
            constant: false,
            enabled: true,
            year: None,
            month: None,
            day: None,
        }
    }

    pub fn dated(mut self, year: i32, month: Option<i32>, day: Option<i32>) -> Self {
        self.year = Some(year);
        self.month = month;
        self.day = day;
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// Sort key for chronological ordering; missing components count as 0.
    pub fn date_key(&self) -> (i32, i32, i32) {
        (
            self.year.unwrap_or(0),
            self.month.unwrap_or(0),
            self.day.unwrap_or(0),
        )
    }

    /// Human-readable date label, e.g. `Year 1042, Month 3, Day 9`.
    pub fn date_label(&self) -> Option<String> {
        let year = self.year?;
        let mut label = format!("Year {year}");
        if let Some(month) = self.month {
            label.push_str(&format!(", Month {month}"));
            if let Some(day) = self.day {
                label.push_str(&format!(", Day {day}"));
            }
        }
        Some(label)
    }
}

/// Maps a `{{char:N}}` placeholder to a concrete character or persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LorebookBinding {
    pub id: i64,
    /// The `N` in `{{char:N}}`
    pub binding: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<i64>,
}

impl LorebookBinding {
    /// The placeholder token this binding resolves, e.g. `{{char:1}}`.
    pub fn placeholder(&self) -> String {
        format!("{{{{char:{}}}}}", self.binding)
    }
}

/// A collection of lore, history, and bindings attached to a chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lorebook {
    pub id: i64,
    pub name: String,
    pub world_lore: Vec<LoreEntry>,
    pub character_lore: Vec<LoreEntry>,
    pub history: Vec<HistoryEntry>,
    pub bindings: Vec<LorebookBinding>,
}

/// Read access to the matchable parts of a lore or history entry.
pub trait MatchableEntry: Send + Sync {
    fn key(&self) -> EntryKey;
    fn keys(&self) -> &str;
    fn content(&self) -> &str;
    fn case_sensitive(&self) -> bool;
    fn use_regex(&self) -> bool;

    /// Comma-split, trimmed, non-empty keys.
    fn key_list(&self) -> Vec<&str> {
        self.keys()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// A lore entry tagged with the collection it came from.
pub struct KindedLore<'a> {
    pub kind: LoreKind,
    pub entry: &'a LoreEntry,
}

impl MatchableEntry for KindedLore<'_> {
    fn key(&self) -> EntryKey {
        EntryKey::new(self.kind, self.entry.id)
    }
    fn keys(&self) -> &str {
        &self.entry.keys
    }
    fn content(&self) -> &str {
        &self.entry.content
    }
    fn case_sensitive(&self) -> bool {
        self.entry.case_sensitive
    }
    fn use_regex(&self) -> bool {
        self.entry.use_regex
    }
}

impl MatchableEntry for HistoryEntry {
    fn key(&self) -> EntryKey {
        EntryKey::new(LoreKind::History, self.id)
    }
    fn keys(&self) -> &str {
        &self.keys
    }
    fn content(&self) -> &str {
        &self.content
    }
    fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }
    fn use_regex(&self) -> bool {
        self.use_regex
    }
}
