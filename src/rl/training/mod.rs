//! Training Infrastructure
//!
//! Experience collection, reward metrics and the DQN training loop.

pub mod driver;
pub mod metrics;
pub mod trainer;

pub use driver::{
    CollectDriver, DriverStats, GreedyPolicy, Policy, RandomPolicy, TransitionObserver,
};
pub use metrics::{MetricSnapshot, TradingMetric};
pub use trainer::{compute_avg_return, Trainer, TrainingReport};
