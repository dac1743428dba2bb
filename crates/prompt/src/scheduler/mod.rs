//! Content inclusion scheduler.
//!
//! Drives the priority iterators and the lore matcher under a token budget:
//!
//! ```text
//! Init ─► RenderCheck ─► TrimIfOverLimit ─► NextTier ─► IterateTier ─┐
//!              ▲                                 │                    │
//!              └──────────── (cadence) ◄─────────┴────────────────────┘
//!                                           Complete after tier 0
//! ```
//!
//! Tier-4 content goes in unconditionally. Each later round pulls a
//! weighted batch from every active iterator, runs matching while below the
//! threshold, and re-renders at a cadence set by the threshold state. Over
//! the limit, the oldest messages are trimmed first.

mod state;
mod threshold;
mod weights;

pub use state::{InclusionState, LoreRef, LoreSet, Phase, Selection, TrimAction};
pub use threshold::ThresholdState;
pub use weights::{ContentKind, WeightedRoundRobin};

use serene_config::SchedulerConfig;
use serene_core::{
    EntryKey, HistoryEntry, KindedLore, LoreEntry, LoreKind, MatchMessage, MatchableEntry,
    Result, TemplateError, TokenCounter, TruncationReason,
};

use crate::iterators::ContentIterators;
use crate::matching::LoreMatchingEngine;

/// Renders the prompt for a given selection so it can be measured.
pub trait SelectionRenderer {
    fn render(&self, selection: &Selection) -> std::result::Result<String, TemplateError>;
}

/// The content one compile call schedules over.
pub struct ContentSources<'a> {
    /// Interpolated chat messages, oldest first
    pub messages: &'a [MatchMessage<'a>],
    pub world_lore: &'a [LoreEntry],
    pub character_lore: &'a [LoreEntry],
    pub history: &'a [HistoryEntry],
    pub iterators: &'a ContentIterators,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerOutcome {
    pub selection: Selection,
    /// Token count at the last render check
    pub tokens: usize,
    pub truncation: Option<TruncationReason>,
    pub iterations: usize,
}

enum CandidateEntry<'a> {
    Lore(KindedLore<'a>),
    History(&'a HistoryEntry),
}

/// A considered entry, remembering where it came from.
struct Candidate<'a> {
    index: usize,
    entry: CandidateEntry<'a>,
}

impl Candidate<'_> {
    fn inner(&self) -> &dyn MatchableEntry {
        match &self.entry {
            CandidateEntry::Lore(lore) => lore,
            CandidateEntry::History(history) => *history,
        }
    }
}

impl MatchableEntry for Candidate<'_> {
    fn key(&self) -> EntryKey {
        self.inner().key()
    }
    fn keys(&self) -> &str {
        self.inner().keys()
    }
    fn content(&self) -> &str {
        self.inner().content()
    }
    fn case_sensitive(&self) -> bool {
        self.inner().case_sensitive()
    }
    fn use_regex(&self) -> bool {
        self.inner().use_regex()
    }
}

pub struct ContentScheduler<'a> {
    config: &'a SchedulerConfig,
    weights: [f64; 4],
    limit: usize,
    counter: &'a dyn TokenCounter,
    matching: &'a LoreMatchingEngine,
}

impl<'a> ContentScheduler<'a> {
    /// `weights` are normalized content weights in [`ContentKind::ALL`] order.
    pub fn new(
        config: &'a SchedulerConfig,
        weights: [f64; 4],
        limit: usize,
        counter: &'a dyn TokenCounter,
        matching: &'a LoreMatchingEngine,
    ) -> Self {
        Self {
            config,
            weights,
            limit,
            counter,
            matching,
        }
    }

    /// Run the state machine to completion.
    pub async fn run(
        &self,
        sources: &ContentSources<'_>,
        renderer: &impl SelectionRenderer,
    ) -> Result<SchedulerOutcome> {
        let mut state = InclusionState::new(self.weights);

        while state.phase != Phase::Complete {
            if state.iteration >= self.config.max_iterations {
                tracing::error!(
                    iteration = state.iteration,
                    priority = state.priority,
                    tokens = state.tokens,
                    "Scheduler hit the iteration cap, completing with current content"
                );
                self.settle_at_cap(&mut state, renderer).await?;
                break;
            }
            state.iteration += 1;

            match state.phase {
                Phase::Init => state.include_tier_four(sources),
                Phase::IterateTier => {
                    if state.pull_round(self.config, self.limit) {
                        self.match_considered(&mut state, sources).await?;
                    }
                    state.finish_round(self.config);
                }
                Phase::RenderCheck => self.measure(&mut state, renderer).await?,
                Phase::TrimIfOverLimit => {
                    if state.tokens <= self.limit {
                        state.record_count(state.tokens, self.limit, self.config);
                        continue;
                    }
                    match state.trim_step(self.config.min_retained_messages) {
                        TrimAction::Exhausted => {
                            tracing::warn!(
                                tokens = state.tokens,
                                limit = self.limit,
                                "Minimum content exceeds the token limit, forcing completion"
                            );
                        }
                        action => {
                            tracing::debug!(?action, tokens = state.tokens, "Trimmed content");
                            self.measure(&mut state, renderer).await?;
                        }
                    }
                }
                Phase::NextTier => {
                    state.advance_tier(sources.iterators);
                    if state.phase == Phase::IterateTier {
                        tracing::debug!(priority = state.priority, "Entering tier");
                    }
                }
                Phase::Complete => {}
            }
        }

        if state.truncation.is_none() && state.selection.messages.len() < sources.messages.len() {
            state.truncation = Some(TruncationReason::TokenLimit);
        }

        Ok(SchedulerOutcome {
            selection: state.selection,
            tokens: state.tokens,
            truncation: state.truncation,
            iterations: state.iteration,
        })
    }

    /// Stop at the iteration cap without leaving the prompt over the limit.
    ///
    /// Content pulled since the last render is measured, then the usual trim
    /// order applies until the prompt fits or nothing is left to drop.
    async fn settle_at_cap(
        &self,
        state: &mut InclusionState,
        renderer: &impl SelectionRenderer,
    ) -> Result<()> {
        self.measure(state, renderer).await?;
        while state.tokens > self.limit {
            if state.trim_step(self.config.min_retained_messages) == TrimAction::Exhausted {
                return Ok(());
            }
            self.measure(state, renderer).await?;
        }
        state.force_complete(TruncationReason::IterationLimit);
        Ok(())
    }

    async fn measure(
        &self,
        state: &mut InclusionState,
        renderer: &impl SelectionRenderer,
    ) -> Result<()> {
        let rendered = renderer.render(&state.selection)?;
        let tokens = self.counter.count_tokens(&rendered).await?;
        state.record_count(tokens, self.limit, self.config);
        tracing::debug!(
            priority = state.priority,
            tokens,
            limit = self.limit,
            threshold = ?state.threshold,
            "Render check"
        );
        Ok(())
    }

    /// Match every considered entry against the included messages.
    async fn match_considered(
        &self,
        state: &mut InclusionState,
        sources: &ContentSources<'_>,
    ) -> Result<()> {
        let messages: Vec<MatchMessage<'_>> = state
            .selection
            .messages
            .iter()
            .rev()
            .filter_map(|i| sources.messages.get(*i).copied())
            .collect();
        let priority = state.priority;

        for kind in [LoreKind::WorldLore, LoreKind::CharacterLore, LoreKind::History] {
            let indices = std::mem::take(state.considered.get_mut(kind));
            if indices.is_empty() {
                continue;
            }
            let candidates: Vec<Candidate<'_>> = indices
                .into_iter()
                .filter_map(|index| candidate(sources, kind, index))
                .collect();

            let outcome = self
                .matching
                .process_matching(&messages, candidates, &mut state.failed_matches, |c| {
                    tracing::debug!(entry = %c.key(), priority, "Including lore");
                })
                .await?;

            state.apply_matches(
                kind,
                outcome.matched.into_iter().map(|c| c.index).collect(),
                outcome.remaining.into_iter().map(|c| c.index).collect(),
            );
        }

        state.pending_match = false;
        Ok(())
    }
}

fn candidate<'a>(sources: &ContentSources<'a>, kind: LoreKind, index: usize) -> Option<Candidate<'a>> {
    let entry = match kind {
        LoreKind::WorldLore => CandidateEntry::Lore(KindedLore {
            kind,
            entry: sources.world_lore.get(index)?,
        }),
        LoreKind::CharacterLore => CandidateEntry::Lore(KindedLore {
            kind,
            entry: sources.character_lore.get(index)?,
        }),
        LoreKind::History => CandidateEntry::History(sources.history.get(index)?),
    };
    Some(Candidate { index, entry })
}
