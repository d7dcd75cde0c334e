//! Trading Environment for RL Training
//!
//! Date-driven environment over recorded or live market data: a clock that
//! walks trading sessions, a builder that turns news and bars into
//! observations, and the episodic state machine on top.

mod clock;
mod observer;
mod trading;

pub use clock::MarketClock;
pub use observer::ObservationBuilder;
pub use trading::{EnvState, StepType, TimeStep, TradingEnvironment};
