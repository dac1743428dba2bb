use serene_core::HistoryEntry;

use super::{PrioritySource, TierCursor};

/// Yields history entry indices, most recent date first.
///
/// Tier 4 is the single most recent entry plus every constant entry; tier 2
/// is the rest. Other tiers are empty. Equal dates keep source order.
#[derive(Debug, Clone, Default)]
pub struct HistoryIterator {
    /// `(index, constant)` sorted by date descending
    ordered: Vec<(usize, bool)>,
}

impl HistoryIterator {
    pub fn new(entries: &[HistoryEntry]) -> Self {
        let mut ordered: Vec<(usize, &HistoryEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.enabled)
            .collect();
        ordered.sort_by(|(_, a), (_, b)| b.date_key().cmp(&a.date_key()));
        Self {
            ordered: ordered.into_iter().map(|(i, e)| (i, e.constant)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn is_tier_four(rank: usize, constant: bool) -> bool {
        rank == 0 || constant
    }
}

impl PrioritySource for HistoryIterator {
    fn tier(&self, priority: u8) -> TierCursor {
        let want_top = match priority {
            4 => true,
            2 => false,
            _ => return TierCursor::empty(),
        };
        TierCursor::new(
            self.ordered
                .iter()
                .enumerate()
                .filter(|(rank, (_, constant))| Self::is_tier_four(*rank, *constant) == want_top)
                .map(|(_, (index, _))| *index)
                .collect(),
        )
    }
}
