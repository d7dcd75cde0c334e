//! RL Configuration
//!
//! Configuration structs for the trading environment and the training loop.
//! Network and agent hyperparameters live next to their modules as burn
//! `Config`s.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::Interval;

fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Trading hours of a calendar day, in UTC.
///
/// `close_hour = 24` means the session runs until midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionWindow {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 24,
        }
    }
}

impl SessionWindow {
    /// Session open instant on `date`
    pub fn open_on(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or_default()
            + Duration::hours(i64::from(self.open_hour))
    }

    /// Session close instant on `date` (exclusive)
    pub fn close_on(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or_default()
            + Duration::hours(i64::from(self.close_hour))
    }

    /// Whether `at` lies in `[open, close)` of its own calendar day
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        at >= self.open_on(day) && at < self.close_on(day)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.open_hour >= 24 {
            errors.push(format!("session.open_hour must be < 24, got {}", self.open_hour));
        }
        if self.close_hour > 24 || self.close_hour <= self.open_hour {
            errors.push(format!(
                "session.close_hour must be in ({}, 24], got {}",
                self.open_hour, self.close_hour
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// When the hold counter is cleared relative to the neutrality scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeutralityOrder {
    /// Clear the counter before the scaling check, so scaling never fires
    #[default]
    ResetFirst,
    /// Scale with the counter accumulated by preceding holds, then clear it
    ScaleFirst,
}

/// Trading environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Symbol being traded
    pub symbol: String,
    /// First instant of the simulation
    pub start: DateTime<Utc>,
    /// Last instant of the simulation
    pub stop: DateTime<Utc>,
    /// Simulated time between two steps
    pub step: Interval,
    /// Bar interval of the price window
    pub price_interval: Interval,
    /// Articles per observation
    pub news_limit: usize,
    /// Starting (and restored) performance percentage
    pub limit_percent: f64,
    /// Steps per episode, `None` for unbounded episodes
    pub limit_steps: Option<usize>,
    /// Enable the HOLD action
    pub use_neutrality: bool,
    pub neutrality_order: NeutralityOrder,
    pub session: SessionWindow,
    /// Calendar days the clock may skip looking for data
    pub max_gap_days: u32,
    /// Doublings allowed when filling the price window
    pub max_lookback_doublings: u32,
    /// Furthest the news lookback may reach
    pub news_max_lookback_days: i64,
    /// Symbol probed for market activity, defaults to `symbol`
    pub probe_symbol: Option<String>,
    /// Listing exchange the symbol must trade on, `None` skips the check
    pub expected_exchange: Option<String>,
    /// Stepping a finished episode starts a new one instead of failing
    pub auto_reset: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            start: utc(2021, 1, 4, 9),
            stop: utc(2021, 6, 30, 9),
            step: Interval::hours(1),
            price_interval: Interval::hours(1),
            news_limit: 30,
            limit_percent: 100.0,
            limit_steps: Some(100),
            use_neutrality: false,
            neutrality_order: NeutralityOrder::default(),
            session: SessionWindow::default(),
            max_gap_days: 10,
            max_lookback_doublings: 6,
            news_max_lookback_days: 365,
            probe_symbol: None,
            expected_exchange: Some("NASDAQ".to_string()),
            auto_reset: true,
        }
    }
}

impl EnvConfig {
    pub fn probe_symbol(&self) -> &str {
        self.probe_symbol.as_deref().unwrap_or(&self.symbol)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.symbol.trim().is_empty() {
            errors.push("environment.symbol must not be empty".to_string());
        }
        if self.stop <= self.start {
            errors.push(format!(
                "environment.stop ({}) must be after start ({})",
                self.stop, self.start
            ));
        }
        if let Err(e) = Interval::supported(&self.price_interval.to_string()) {
            errors.push(e.to_string());
        }
        if self.step.duration() <= Duration::zero() {
            errors.push("environment.step must be positive".to_string());
        }
        if self.news_limit == 0 {
            errors.push("environment.news_limit must be at least 1".to_string());
        }
        if self.limit_percent <= 0.0 {
            errors.push("environment.limit_percent must be positive".to_string());
        }
        if self.limit_steps == Some(0) {
            errors.push("environment.limit_steps must be at least 1 when set".to_string());
        }
        if self.max_gap_days == 0 {
            errors.push("environment.max_gap_days must be at least 1".to_string());
        }
        if self.news_max_lookback_days < 1 {
            errors.push("environment.news_max_lookback_days must be at least 1".to_string());
        }
        if let Err(session) = self.session.validate() {
            errors.extend(session);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Training loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Random-policy steps before the first update
    pub initial_collect_steps: usize,
    /// Environment steps per training iteration
    pub collect_steps_per_iteration: usize,
    pub num_iterations: usize,
    pub replay_capacity: usize,
    /// Iterations between loss log lines
    pub log_interval: usize,
    /// Iterations between evaluations
    pub eval_interval: usize,
    pub num_eval_episodes: usize,
    /// Hard cap on steps per evaluation episode
    pub max_eval_steps: usize,
    /// CSV file receiving one metric row per evaluation
    pub metrics_csv: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            initial_collect_steps: 50,
            collect_steps_per_iteration: 1,
            num_iterations: 20,
            replay_capacity: 100,
            log_interval: 5,
            eval_interval: 10,
            num_eval_episodes: 1,
            max_eval_steps: 200,
            metrics_csv: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.replay_capacity == 0 {
            errors.push("training.replay_capacity must be at least 1".to_string());
        }
        if self.collect_steps_per_iteration == 0 {
            errors.push("training.collect_steps_per_iteration must be at least 1".to_string());
        }
        if self.log_interval == 0 || self.eval_interval == 0 {
            errors.push("training.log_interval and eval_interval must be at least 1".to_string());
        }
        if self.max_eval_steps == 0 {
            errors.push("training.max_eval_steps must be at least 1".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
