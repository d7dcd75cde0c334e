pub mod adapters;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod rl;

pub use config::AppConfig;
pub use error::{Result, SentiError};
pub use rl::{DqnAgent, EnvConfig, TradingEnvironment, TradingQNetwork, Trainer};
