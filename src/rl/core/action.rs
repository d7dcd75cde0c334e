//! Action Space
//!
//! Discrete trading actions scored by the Q-network.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentiError};

/// Discrete trading action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TradeAction {
    /// Profits when the price falls
    Sell = 0,
    /// Profits when the price rises
    Buy = 1,
    /// Stay out of the market (neutrality mode only)
    Hold = 2,
}

impl TradeAction {
    pub fn to_index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sell => "SELL",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Set of actions valid for an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub neutrality: bool,
}

impl ActionSpace {
    pub fn new(neutrality: bool) -> Self {
        Self { neutrality }
    }

    /// 2 without neutrality, 3 with it
    pub fn len(&self) -> usize {
        if self.neutrality {
            3
        } else {
            2
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.len()
    }

    pub fn decode(&self, index: usize) -> Result<TradeAction> {
        match index {
            0 => Ok(TradeAction::Sell),
            1 => Ok(TradeAction::Buy),
            2 if self.neutrality => Ok(TradeAction::Hold),
            _ => Err(SentiError::InvalidAction(index)),
        }
    }

    pub fn actions(&self) -> Vec<TradeAction> {
        (0..self.len()).filter_map(|i| self.decode(i).ok()).collect()
    }
}
