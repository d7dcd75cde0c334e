//! Reward Functions
//!
//! Percentage rewards, episode performance bookkeeping and the optional
//! neutrality scaling.

use serde::{Deserialize, Serialize};

use super::action::TradeAction;

/// Multiplier applied to rewards that the hold period makes look worse
const AMPLIFY: f64 = 1.2;
/// Multiplier applied to rewards that the hold period makes look better
const DAMPEN: f64 = 0.8;

/// Percentage reward of `action` when the price moves `last -> current`
pub fn percent_reward(action: TradeAction, last: f64, current: f64) -> f64 {
    if last == 0.0 {
        return 0.0;
    }
    match action {
        TradeAction::Sell => (last - current) / last * 100.0,
        TradeAction::Buy => (current - last) / last * 100.0,
        TradeAction::Hold => 0.0,
    }
}

/// Scale a SELL/BUY reward by how it compares to the closes seen while holding.
///
/// SELL compares against the window minimum, BUY against the maximum. An
/// empty window or a HOLD leaves the reward untouched.
pub fn scale_for_neutrality(
    action: TradeAction,
    reward: f64,
    window_closes: &[f64],
    current: f64,
) -> f64 {
    let extreme = match action {
        TradeAction::Sell => window_closes.iter().copied().reduce(f64::min),
        TradeAction::Buy => window_closes.iter().copied().reduce(f64::max),
        TradeAction::Hold => None,
    };

    match extreme {
        Some(extreme) if extreme <= current => {
            reward * if reward < 0.0 { AMPLIFY } else { DAMPEN }
        }
        Some(_) => reward * if reward > 0.0 { AMPLIFY } else { DAMPEN },
        None => reward,
    }
}

/// Running performance of one episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMeter {
    pub percent: f64,
    pub limit_percent: f64,
    pub steps: usize,
    pub limit_steps: Option<usize>,
}

impl PerformanceMeter {
    pub fn new(limit_percent: f64, limit_steps: Option<usize>) -> Self {
        Self {
            percent: limit_percent,
            limit_percent,
            steps: 0,
            limit_steps,
        }
    }

    /// Start of an episode
    pub fn reset(&mut self) {
        self.percent = self.limit_percent;
        self.steps = 0;
    }

    pub fn accumulate(&mut self, reward: f64) {
        self.percent += reward;
    }

    /// Count one step; true once the step ceiling is reached
    pub fn tick(&mut self) -> bool {
        match self.limit_steps {
            Some(limit) => {
                self.steps += 1;
                self.steps >= limit
            }
            None => false,
        }
    }

    pub fn is_bust(&self) -> bool {
        self.percent < 0.0
    }

    /// Put `percent` back at the ceiling after a bust
    pub fn restore(&mut self) {
        self.percent = self.limit_percent;
    }
}

/// Consecutive HOLD actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeutralityCounter {
    count: usize,
}

impl NeutralityCounter {
    pub fn hold(&mut self) {
        self.count += 1;
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_active(&self) -> bool {
        self.count > 0
    }
}
