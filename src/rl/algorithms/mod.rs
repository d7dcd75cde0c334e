//! RL Algorithms
//!
//! Value-based training of the trading Q-network.

pub mod dqn;

pub use dqn::{DqnAgent, DqnConfig};
