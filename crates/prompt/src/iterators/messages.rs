use super::{PrioritySource, TierCursor};

/// Yields chat message indices, newest first.
///
/// Tier 4 is the most recent `window` messages; tier 2 is everything older.
/// Other tiers are empty.
#[derive(Debug, Clone)]
pub struct MessageIterator {
    total: usize,
    window: usize,
}

impl MessageIterator {
    pub fn new(total: usize, window: usize) -> Self {
        Self { total, window }
    }

    fn window_start(&self) -> usize {
        self.total.saturating_sub(self.window)
    }
}

impl PrioritySource for MessageIterator {
    fn tier(&self, priority: u8) -> TierCursor {
        let start = self.window_start();
        match priority {
            4 => TierCursor::new((start..self.total).rev().collect()),
            2 => TierCursor::new((0..start).rev().collect()),
            _ => TierCursor::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_window_newest_first() {
        let it = MessageIterator::new(10, 3);
        assert_eq!(it.tier(4).collect::<Vec<_>>(), vec![9, 8, 7]);
        assert_eq!(
            it.tier(2).collect::<Vec<_>>(),
            vec![6, 5, 4, 3, 2, 1, 0]
        );
    }

    #[test]
    fn short_history_fits_in_window() {
        let it = MessageIterator::new(2, 3);
        assert_eq!(it.tier(4).collect::<Vec<_>>(), vec![1, 0]);
        assert!(it.tier(2).is_exhausted());
    }

    #[test]
    fn odd_tiers_are_empty() {
        let it = MessageIterator::new(10, 3);
        for p in [3, 1, 0] {
            assert!(it.tier(p).is_exhausted());
        }
    }
}
