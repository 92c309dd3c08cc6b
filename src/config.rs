use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ORDER: usize = 3;
pub const DEFAULT_REPLY_BUDGET_MS: u64 = 500;
pub const DEFAULT_BABBLE_COUNT: usize = 5;

/// Schema version written by `MemoryGraph::create` and required on open.
pub const BRAIN_VERSION: &str = "2";

/// Returned by `Brain::reply` when no candidate was scored within budget.
pub const NO_REPLY: &str = "no replies :  (";

/// Which reply wins when two candidates score the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the reply found first; only a strictly greater score replaces it.
    #[default]
    KeepEarliest,
    /// Equal scores replace the current best.
    TakeLatest,
}

impl TieBreak {
    pub fn replaces(self, candidate: f64, best: f64) -> bool {
        match self {
            TieBreak::KeepEarliest => candidate > best,
            TieBreak::TakeLatest => candidate >= best,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainConfig {
    /// Wall-clock budget for one reply, measured from the start of the call
    pub reply_budget: Duration,
    pub tie_break: TieBreak,
    /// How many random tokens to sample when the input offers no pivot
    pub babble_count: usize,
    /// Skip candidates whose rendered text is longer than this many characters
    pub max_reply_len: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            reply_budget: Duration::from_millis(DEFAULT_REPLY_BUDGET_MS),
            tie_break: TieBreak::default(),
            babble_count: DEFAULT_BABBLE_COUNT,
            max_reply_len: None,
            seed: None,
        }
    }
}

impl BrainConfig {
    pub fn with_budget_ms(mut self, ms: u64) -> Self {
        self.reply_budget = Duration::from_millis(ms);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_policy() {
        let config = BrainConfig::default();
        assert_eq!(config.reply_budget, Duration::from_millis(500));
        assert_eq!(config.tie_break, TieBreak::KeepEarliest);
        assert_eq!(config.babble_count, 5);
        assert!(config.max_reply_len.is_none());
    }

    #[test]
    fn tie_break_policies() {
        assert!(!TieBreak::KeepEarliest.replaces(1.0, 1.0));
        assert!(TieBreak::KeepEarliest.replaces(1.5, 1.0));
        assert!(TieBreak::TakeLatest.replaces(1.0, 1.0));
        assert!(!TieBreak::TakeLatest.replaces(0.5, 1.0));
    }
}
