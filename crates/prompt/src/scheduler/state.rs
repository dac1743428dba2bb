//! Inclusion state and the pure transitions the scheduler drives.
//!
//! Everything the assembly loop knows lives in [`InclusionState`]: current
//! tier, cursors, weight accumulators, what has been included or is still a
//! candidate, the last token count, and why content was cut. Transitions
//! here never touch the token counter or the matcher; the async driver in
//! the parent module does that and feeds results back in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serene_config::SchedulerConfig;
use serene_core::{FailedMatches, LoreKind, MAX_PRIORITY, TruncationReason};

use super::ContentSources;
use super::threshold::{BudgetRoom, ThresholdState};
use super::weights::{ContentKind, WeightedRoundRobin};
use crate::iterators::{ContentIterators, TierCursor, TierCursors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Init,
    IterateTier,
    RenderCheck,
    TrimIfOverLimit,
    NextTier,
    Complete,
}

/// Indices into the three lore collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoreSet {
    pub world_lore: Vec<usize>,
    pub character_lore: Vec<usize>,
    pub history: Vec<usize>,
}

impl LoreSet {
    pub fn get(&self, kind: LoreKind) -> &[usize] {
        match kind {
            LoreKind::WorldLore => &self.world_lore,
            LoreKind::CharacterLore => &self.character_lore,
            LoreKind::History => &self.history,
        }
    }

    pub fn get_mut(&mut self, kind: LoreKind) -> &mut Vec<usize> {
        match kind {
            LoreKind::WorldLore => &mut self.world_lore,
            LoreKind::CharacterLore => &mut self.character_lore,
            LoreKind::History => &mut self.history,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.world_lore.is_empty() && self.character_lore.is_empty() && self.history.is_empty()
    }

    pub fn len(&self) -> usize {
        self.world_lore.len() + self.character_lore.len() + self.history.len()
    }
}

/// What is currently in the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Chat message indices; always a contiguous suffix of the history
    pub messages: BTreeSet<usize>,
    /// Lore indices in inclusion order
    pub lore: LoreSet,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.messages.len() + self.lore.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.lore.is_empty()
    }
}

/// A non-constant lore entry that may be dropped by the secondary trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoreRef {
    pub kind: LoreKind,
    pub index: usize,
}

/// Result of one trim step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimAction {
    DroppedMessage(usize),
    DroppedLore(LoreRef),
    /// Nothing left to drop
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusionState {
    pub phase: Phase,
    pub priority: u8,
    pub iteration: usize,
    /// Rounds since the last render
    pub since_render: usize,
    pub cursors: TierCursors,
    /// Set once trimming has dropped a message; no older message may return
    pub messages_closed: bool,
    pub round_robin: WeightedRoundRobin,
    pub selection: Selection,
    /// Pulled lore awaiting a keyword match
    pub considered: LoreSet,
    /// Droppable lore, oldest inclusion first
    pub droppable: Vec<LoreRef>,
    pub failed_matches: FailedMatches,
    /// New messages or candidates since the last matching pass
    pub pending_match: bool,
    pub tokens: usize,
    /// Selection size when `tokens` was measured
    pub measured_items: usize,
    pub threshold: ThresholdState,
    pub truncation: Option<TruncationReason>,
}

impl InclusionState {
    pub fn new(weights: [f64; 4]) -> Self {
        Self {
            phase: Phase::Init,
            priority: MAX_PRIORITY,
            iteration: 0,
            since_render: 0,
            cursors: TierCursors::default(),
            messages_closed: false,
            round_robin: WeightedRoundRobin::new(weights),
            selection: Selection::default(),
            considered: LoreSet::default(),
            droppable: Vec::new(),
            failed_matches: FailedMatches::new(),
            pending_match: false,
            tokens: 0,
            measured_items: 0,
            threshold: ThresholdState::Below,
            truncation: None,
        }
    }

    /// Include every tier-4 item unconditionally, then ask for a render.
    pub fn include_tier_four(&mut self, sources: &ContentSources<'_>) {
        self.priority = MAX_PRIORITY;
        self.cursors = sources.iterators.open(MAX_PRIORITY);

        self.selection.messages.extend(self.cursors.messages.drain());
        self.selection
            .lore
            .world_lore
            .extend(self.cursors.world_lore.drain());
        self.selection
            .lore
            .character_lore
            .extend(self.cursors.character_lore.drain());

        for index in self.cursors.history.drain() {
            self.selection.lore.history.push(index);
            if !sources.history[index].constant {
                self.droppable.push(LoreRef {
                    kind: LoreKind::History,
                    index,
                });
            }
        }

        self.pending_match = !self.selection.messages.is_empty();
        self.phase = Phase::RenderCheck;
    }

    fn cursor_mut(&mut self, kind: ContentKind) -> &mut TierCursor {
        match kind {
            ContentKind::ChatMessages => &mut self.cursors.messages,
            ContentKind::WorldLore => &mut self.cursors.world_lore,
            ContentKind::CharacterLore => &mut self.cursors.character_lore,
            ContentKind::History => &mut self.cursors.history,
        }
    }

    /// Which kinds may pull this round.
    ///
    /// Messages may be added until the prompt is over the limit; lore and
    /// history only while below the threshold.
    pub fn active_kinds(&self) -> [bool; 4] {
        let lore_open = self.threshold == ThresholdState::Below;
        [
            !self.messages_closed
                && self.threshold != ThresholdState::Over
                && !self.cursors.messages.is_exhausted(),
            lore_open && !self.cursors.world_lore.is_exhausted(),
            lore_open && !self.cursors.character_lore.is_exhausted(),
            lore_open && !self.cursors.history.is_exhausted(),
        ]
    }

    /// Nothing more can be pulled at this tier.
    pub fn tier_settled(&self) -> bool {
        !self.active_kinds().iter().any(|a| *a)
    }

    /// Pull one weighted round of items.
    ///
    /// Returns true when a matching pass should follow.
    pub fn pull_round(&mut self, config: &SchedulerConfig, limit: usize) -> bool {
        let kinds = self.round_robin.select(self.active_kinds());
        let room = BudgetRoom {
            tokens: self.tokens,
            limit,
            items: self.measured_items,
        };
        let batch = self.threshold.adaptive_batch(config, room, kinds.len());

        for kind in kinds {
            let pulled = self.cursor_mut(kind).take_batch(batch);
            if pulled.is_empty() {
                continue;
            }
            tracing::debug!(
                priority = self.priority,
                kind = ?kind,
                count = pulled.len(),
                "Pulled content"
            );
            match kind.lore_kind() {
                None => self.selection.messages.extend(pulled),
                Some(lore) => self.considered.get_mut(lore).extend(pulled),
            }
            self.pending_match = true;
        }

        self.threshold == ThresholdState::Below && self.pending_match && !self.considered.is_empty()
    }

    /// Move matched candidates of `kind` into the selection.
    pub fn apply_matches(&mut self, kind: LoreKind, matched: Vec<usize>, remaining: Vec<usize>) {
        for index in matched {
            self.selection.lore.get_mut(kind).push(index);
            self.droppable.push(LoreRef { kind, index });
        }
        *self.considered.get_mut(kind) = remaining;
    }

    /// Store a fresh token count and pick the next phase.
    pub fn record_count(&mut self, tokens: usize, limit: usize, config: &SchedulerConfig) {
        self.tokens = tokens;
        self.measured_items = self.selection.len();
        self.threshold = ThresholdState::classify(tokens, limit, config.threshold_percent);
        self.since_render = 0;
        self.phase = if self.threshold == ThresholdState::Over {
            Phase::TrimIfOverLimit
        } else if self.tier_settled() {
            Phase::NextTier
        } else {
            Phase::IterateTier
        };
    }

    /// Count a round and decide whether it is time to re-render.
    pub fn finish_round(&mut self, config: &SchedulerConfig) {
        self.since_render += 1;
        if self.since_render >= self.threshold.render_interval(config) || self.tier_settled() {
            self.phase = Phase::RenderCheck;
        }
    }

    /// Drop one item to get back under the limit.
    ///
    /// The oldest included message goes first, down to `floor` messages.
    /// After that the most recently included non-constant lore goes. When
    /// neither is possible assembly is forced to complete.
    pub fn trim_step(&mut self, floor: usize) -> TrimAction {
        if self.selection.messages.len() > floor {
            if let Some(oldest) = self.selection.messages.pop_first() {
                self.messages_closed = true;
                self.cursors.messages = TierCursor::empty();
                self.truncation = Some(TruncationReason::TokenLimit);
                return TrimAction::DroppedMessage(oldest);
            }
        }

        if let Some(lore) = self.droppable.pop() {
            self.selection.lore.get_mut(lore.kind).retain(|i| *i != lore.index);
            return TrimAction::DroppedLore(lore);
        }

        self.truncation = Some(TruncationReason::MinimumContentExceeded);
        self.phase = Phase::Complete;
        TrimAction::Exhausted
    }

    /// Descend to the next tier, or complete after tier 0.
    pub fn advance_tier(&mut self, iterators: &ContentIterators) {
        if self.priority == 0 {
            self.phase = Phase::Complete;
            return;
        }
        self.priority -= 1;
        self.cursors = iterators.open(self.priority);
        if self.messages_closed {
            self.cursors.messages = TierCursor::empty();
        }
        self.phase = Phase::IterateTier;
    }

    /// Stop immediately, keeping whatever is assembled.
    pub fn force_complete(&mut self, reason: TruncationReason) {
        self.truncation = Some(reason);
        self.phase = Phase::Complete;
    }
}
