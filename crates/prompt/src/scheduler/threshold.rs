use serde::{Deserialize, Serialize};
use serene_config::SchedulerConfig;

/// The last measurement, as seen by [`ThresholdState::adaptive_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetRoom {
    pub tokens: usize,
    pub limit: usize,
    /// Items included when `tokens` was measured
    pub items: usize,
}

/// Where the running token count sits relative to the budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdState {
    /// Under `limit * threshold_percent`: new lore may still be added
    #[default]
    Below,
    /// At or past the threshold but within the limit
    Above,
    /// Past the limit: trim
    Over,
}

impl ThresholdState {
    pub fn classify(tokens: usize, limit: usize, threshold_percent: f64) -> Self {
        if tokens > limit {
            Self::Over
        } else if (tokens as f64) < limit as f64 * threshold_percent {
            Self::Below
        } else {
            Self::Above
        }
    }

    /// Items pulled from each selected iterator per round.
    pub fn batch_size(&self, config: &SchedulerConfig) -> usize {
        match self {
            Self::Below => config.batch_size_below,
            Self::Above => config.batch_size_above,
            Self::Over => config.batch_size_over,
        }
    }

    /// Batch size for the next round given the last measurement.
    ///
    /// Below the threshold the configured batch is a floor: the batch grows
    /// so that the rounds until the next render spend about half of the
    /// room left under the threshold, at the average cost of what was
    /// included when the prompt was last measured. `kinds` is the number of
    /// iterators pulling this round.
    pub fn adaptive_batch(
        &self,
        config: &SchedulerConfig,
        room: BudgetRoom,
        kinds: usize,
    ) -> usize {
        let base = self.batch_size(config);
        if *self != Self::Below || room.tokens == 0 || room.items == 0 {
            return base;
        }
        let target = room.limit as f64 * config.threshold_percent;
        let left = target - room.tokens as f64;
        if left <= 0.0 {
            return base;
        }
        let per_item = room.tokens as f64 / room.items as f64;
        let rounds = self.render_interval(config).max(1) * kinds.max(1);
        let grown = left / per_item / (2 * rounds) as f64;
        base.max(grown as usize)
    }

    /// Rounds between re-renders.
    pub fn render_interval(&self, config: &SchedulerConfig) -> usize {
        match self {
            Self::Below => config.render_interval_below,
            Self::Above => config.render_interval_above,
            Self::Over => config.render_interval_over,
        }
    }
}
