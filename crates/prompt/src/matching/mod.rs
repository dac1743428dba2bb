//! Lore matching: which lore and history entries apply to the conversation.
//!
//! [`LoreMatchingEngine`] owns the active [`LoreMatchingStrategy`] and runs
//! candidate entries against the currently included chat messages. The
//! strategy can be swapped at runtime without touching the scheduler.

mod keyword;
mod vector;

pub use keyword::KeywordMatchingStrategy;
pub use vector::{VectorMatchingStrategy, cosine_similarity};

use std::sync::Arc;

use serene_config::MatchingConfig;
use serene_core::{
    Embedder, FailedMatches, LoreMatchingStrategy, MatchMessage, MatchableEntry, MatchingError,
};

/// Result of one matching pass.
#[derive(Debug)]
pub struct MatchOutcome<E> {
    pub matched: Vec<E>,
    pub remaining: Vec<E>,
}

impl<E> Default for MatchOutcome<E> {
    fn default() -> Self {
        Self {
            matched: Vec::new(),
            remaining: Vec::new(),
        }
    }
}

pub struct LoreMatchingEngine {
    strategy: Box<dyn LoreMatchingStrategy>,
}

impl Default for LoreMatchingEngine {
    fn default() -> Self {
        Self::keyword()
    }
}

impl LoreMatchingEngine {
    /// Wrap a strategy that is ready to use (initialized if it needs to be).
    pub fn new(strategy: Box<dyn LoreMatchingStrategy>) -> Self {
        Self { strategy }
    }

    /// The always-available keyword strategy.
    pub fn keyword() -> Self {
        Self::new(Box::new(KeywordMatchingStrategy::new()))
    }

    /// Build and initialize the strategy named in config.
    ///
    /// The vector strategy needs an embedder; without one the engine falls
    /// back to keyword matching.
    pub async fn from_config(
        config: &MatchingConfig,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self, MatchingError> {
        match (config.strategy.as_str(), embedder) {
            ("vector", Some(embedder)) => {
                let mut strategy = VectorMatchingStrategy::new(embedder, config.vector_threshold);
                strategy.initialize().await?;
                Ok(Self::new(Box::new(strategy)))
            }
            ("vector", None) => {
                tracing::warn!("Vector matching requested without an embedder, using keyword");
                Ok(Self::keyword())
            }
            _ => Ok(Self::keyword()),
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Swap the active strategy: clean up the old one, initialize the new.
    pub async fn set_strategy(
        &mut self,
        mut strategy: Box<dyn LoreMatchingStrategy>,
    ) -> Result<(), MatchingError> {
        strategy.initialize().await?;
        if let Err(e) = self.strategy.cleanup().await {
            tracing::warn!(strategy = self.strategy.name(), error = %e, "Strategy cleanup failed");
        }
        tracing::debug!(
            from = self.strategy.name(),
            to = strategy.name(),
            "Switched lore matching strategy"
        );
        self.strategy = strategy;
        Ok(())
    }

    /// Try every considered entry against every message.
    ///
    /// The first message that matches wins; the entry moves to `matched` and
    /// `on_match` runs on it. Entries with no match stay in `remaining` for a
    /// later pass. Failed (message, entry) pairs are memoized in `failed` and
    /// never re-evaluated.
    pub async fn process_matching<E: MatchableEntry>(
        &self,
        messages: &[MatchMessage<'_>],
        considered: Vec<E>,
        failed: &mut FailedMatches,
        mut on_match: impl FnMut(&E),
    ) -> Result<MatchOutcome<E>, MatchingError> {
        let mut outcome = MatchOutcome::default();

        for entry in considered {
            let key = entry.key();
            let mut hit = false;
            for message in messages {
                if failed.has_failed(message.id, key) {
                    continue;
                }
                if self.strategy.matches_message(&entry, message).await? {
                    tracing::debug!(entry = %key, message_id = message.id, "Lore entry matched");
                    hit = true;
                    break;
                }
                failed.record(message.id, key);
            }

            if hit {
                failed.forget_entry(key);
                on_match(&entry);
                outcome.matched.push(entry);
            } else {
                outcome.remaining.push(entry);
            }
        }

        Ok(outcome)
    }
}
