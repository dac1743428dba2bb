//! Deficit round-robin across the four content kinds.
//!
//! Each round, every active kind's accumulator grows by its normalized
//! weight. A kind whose accumulator reaches 1.0 pays 1.0 and is processed
//! this round. The heaviest kind is processed every round; a kind with half
//! its weight every other round.
//!
//! Final fill: once every kind carrying the top weight is inactive, the
//! remaining active kinds are re-normalized among themselves so leftover
//! budget is not spent on idle rounds.

use serde::{Deserialize, Serialize};
use serene_core::LoreKind;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    ChatMessages,
    WorldLore,
    CharacterLore,
    History,
}

impl ContentKind {
    /// Scheduler order; matches `ContentWeights::as_array`.
    pub const ALL: [ContentKind; 4] = [
        Self::ChatMessages,
        Self::WorldLore,
        Self::CharacterLore,
        Self::History,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::ChatMessages => 0,
            Self::WorldLore => 1,
            Self::CharacterLore => 2,
            Self::History => 3,
        }
    }

    pub fn lore_kind(self) -> Option<LoreKind> {
        match self {
            Self::ChatMessages => None,
            Self::WorldLore => Some(LoreKind::WorldLore),
            Self::CharacterLore => Some(LoreKind::CharacterLore),
            Self::History => Some(LoreKind::History),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedRoundRobin {
    weights: [f64; 4],
    accumulators: [f64; 4],
}

impl WeightedRoundRobin {
    /// `weights` should already be normalized (max 1.0).
    pub fn new(weights: [f64; 4]) -> Self {
        Self {
            weights,
            accumulators: [0.0; 4],
        }
    }

    pub fn accumulators(&self) -> [f64; 4] {
        self.accumulators
    }

    /// True when no active kind carries the top weight.
    pub fn is_final_fill(&self, active: [bool; 4]) -> bool {
        active.iter().any(|a| *a) && self.max_active(active) < 1.0 - EPSILON
    }

    fn max_active(&self, active: [bool; 4]) -> f64 {
        self.weights
            .iter()
            .zip(active)
            .filter(|(_, a)| *a)
            .map(|(w, _)| *w)
            .fold(0.0, f64::max)
    }

    fn effective_weights(&self, active: [bool; 4]) -> [f64; 4] {
        if !self.is_final_fill(active) {
            return self.weights;
        }
        let max = self.max_active(active);
        if max <= EPSILON {
            return [1.0; 4];
        }
        self.weights.map(|w| w / max)
    }

    /// Advance one round and return the kinds to process, in scheduler order.
    pub fn select(&mut self, active: [bool; 4]) -> Vec<ContentKind> {
        let effective = self.effective_weights(active);
        let mut selected = Vec::new();
        for kind in ContentKind::ALL {
            let i = kind.index();
            if !active[i] {
                continue;
            }
            self.accumulators[i] += effective[i];
            if self.accumulators[i] >= 1.0 - EPSILON {
                self.accumulators[i] -= 1.0;
                selected.push(kind);
            }
        }
        selected
    }
}
