//! Reinforcement Learning Module
//!
//! News-sentiment trading agent built on the Burn framework.
//!
//! # Features
//!
//! - **Environment**: session-aware market clock, news + price observations
//! - **Action Space**: Sell / Buy, plus Hold in neutrality mode
//! - **Network**: text and price LSTM branches fused into a Q-network
//! - **Algorithm**: DQN with replay buffer and target network

pub mod algorithms;
pub mod config;
pub mod core;
pub mod environment;
pub mod memory;
pub mod networks;
pub mod training;

// Config exports
pub use config::{EnvConfig, NeutralityOrder, SessionWindow, TrainingConfig};

// Core exports
pub use core::{ActionSpace, ObservationBundle, ObservationSpec, TradeAction};

// Environment exports
pub use environment::{EnvState, StepType, TimeStep, TradingEnvironment};

// Memory exports
pub use memory::{ReplayBuffer, Transition};

// Network / agent exports
pub use algorithms::{DqnAgent, DqnConfig};
pub use networks::{QNetworkConfig, TradingQNetwork};

// Training exports
pub use training::{Trainer, TrainingReport};
