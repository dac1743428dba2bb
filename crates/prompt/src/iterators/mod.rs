//! Priority-tiered content iterators.
//!
//! Each iterator precomputes, per tier, the ordered list of indices it will
//! yield into its source slice. A [`TierCursor`] then walks that list. There
//! is no hidden resumption state: a cursor is plain data and serializes with
//! the rest of the inclusion state.

mod history;
mod lore;
mod messages;

pub use history::HistoryIterator;
pub use lore::LoreIterator;
pub use messages::MessageIterator;

use serde::{Deserialize, Serialize};

/// Something that yields source indices grouped by priority tier.
pub trait PrioritySource {
    /// The indices this source yields at `priority`, in yield order.
    fn tier(&self, priority: u8) -> TierCursor;
}

/// A cursor over one tier's precomputed index list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCursor {
    indices: Vec<usize>,
    pos: usize,
}

impl TierCursor {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices, pos: 0 }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.indices.len()
    }

    pub fn remaining(&self) -> usize {
        self.indices.len().saturating_sub(self.pos)
    }

    /// Take up to `n` items.
    pub fn take_batch(&mut self, n: usize) -> Vec<usize> {
        let end = self.pos.saturating_add(n).min(self.indices.len());
        let batch = self.indices[self.pos..end].to_vec();
        self.pos = end;
        batch
    }

    /// Take everything left.
    pub fn drain(&mut self) -> Vec<usize> {
        self.take_batch(self.remaining())
    }
}

impl Iterator for TierCursor {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let item = self.indices.get(self.pos).copied()?;
        self.pos += 1;
        Some(item)
    }
}

/// The four iterators one compile call draws from.
#[derive(Debug, Clone)]
pub struct ContentIterators {
    pub messages: MessageIterator,
    pub world_lore: LoreIterator,
    pub character_lore: LoreIterator,
    pub history: HistoryIterator,
}

/// One cursor per content kind, all opened at the same tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCursors {
    pub messages: TierCursor,
    pub world_lore: TierCursor,
    pub character_lore: TierCursor,
    pub history: TierCursor,
}

impl ContentIterators {
    pub fn open(&self, priority: u8) -> TierCursors {
        TierCursors {
            messages: self.messages.tier(priority),
            world_lore: self.world_lore.tier(priority),
            character_lore: self.character_lore.tier(priority),
            history: self.history.tier(priority),
        }
    }
}
