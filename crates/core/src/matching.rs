//! Lore matching traits.
//!
//! A matching strategy answers one question: does this lore or history
//! entry apply to this chat message? Strategies are swappable at runtime;
//! those that load models (embeddings) do so in `initialize`.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MatchingError;
use crate::lorebook::{EntryKey, MatchableEntry};
use crate::message::Role;

/// A chat message as seen by a matching strategy.
#[derive(Debug, Clone, Copy)]
pub struct MatchMessage<'a> {
    pub id: i64,
    pub role: Role,
    /// Interpolated message text
    pub text: &'a str,
}

#[async_trait]
pub trait LoreMatchingStrategy: Send + Sync {
    /// Strategy name, used in logs and errors.
    fn name(&self) -> &str;

    /// Load whatever the strategy needs before the first match.
    async fn initialize(&mut self) -> Result<(), MatchingError> {
        Ok(())
    }

    /// Release resources when the strategy is swapped out.
    async fn cleanup(&mut self) -> Result<(), MatchingError> {
        Ok(())
    }

    /// Whether `entry` applies to `message`.
    async fn matches_message(
        &self,
        entry: &dyn MatchableEntry,
        message: &MatchMessage<'_>,
    ) -> Result<bool, MatchingError>;
}

/// Produces embedding vectors for similarity matching.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MatchingError>;
}

/// Memo of (message, entry) pairs already known not to match.
///
/// Messages are immutable once included, so a failed pair never needs to be
/// re-evaluated within one compile call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedMatches {
    by_message: BTreeMap<i64, BTreeSet<EntryKey>>,
}

impl FailedMatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_failed(&self, message_id: i64, entry: EntryKey) -> bool {
        self.by_message
            .get(&message_id)
            .is_some_and(|entries| entries.contains(&entry))
    }

    pub fn record(&mut self, message_id: i64, entry: EntryKey) {
        self.by_message.entry(message_id).or_default().insert(entry);
    }

    /// Forget every failure involving `entry` (e.g. after it matched).
    pub fn forget_entry(&mut self, entry: EntryKey) {
        for entries in self.by_message.values_mut() {
            entries.remove(&entry);
        }
    }

    pub fn len(&self) -> usize {
        self.by_message.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lorebook::LoreKind;

    #[test]
    fn records_and_queries_failures() {
        let mut memo = FailedMatches::new();
        let entry = EntryKey::new(LoreKind::WorldLore, 4);
        assert!(!memo.has_failed(1, entry));
        memo.record(1, entry);
        memo.record(1, entry);
        assert!(memo.has_failed(1, entry));
        assert!(!memo.has_failed(2, entry));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn entry_kinds_do_not_collide() {
        let mut memo = FailedMatches::new();
        memo.record(1, EntryKey::new(LoreKind::WorldLore, 4));
        assert!(!memo.has_failed(1, EntryKey::new(LoreKind::History, 4)));
    }

    #[test]
    fn forget_entry_clears_all_messages() {
        let mut memo = FailedMatches::new();
        let entry = EntryKey::new(LoreKind::CharacterLore, 2);
        memo.record(1, entry);
        memo.record(2, entry);
        memo.forget_entry(entry);
        assert!(memo.is_empty());
    }
}
