//! Core RL abstractions
//!
//! Actions, observations and rewards shared by the environment and the agent.

pub mod action;
pub mod observation;
pub mod reward;

pub use action::{ActionSpace, TradeAction};
pub use observation::{
    ObservationBundle, ObservationSpec, PARAGRAPH_TOKENS, PRICE_FIELDS, PRICE_WINDOW,
    SYMBOL_TOKENS, TITLE_TOKENS,
};
pub use reward::{percent_reward, scale_for_neutrality, NeutralityCounter, PerformanceMeter};
