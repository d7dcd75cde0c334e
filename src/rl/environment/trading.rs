//! Trading Environment for RL Training
//!
//! Episodic environment with a reset/step interface. Each step trades the
//! configured symbol over one clock step and pays the percentage move as
//! reward.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, info_span, Span};

use super::clock::MarketClock;
use super::observer::ObservationBuilder;
use crate::data::{closest_bar, window_closes, NewsSource, PriceSource, Tokenizer};
use crate::error::{Result, SentiError};
use crate::rl::config::{EnvConfig, NeutralityOrder};
use crate::rl::core::{
    percent_reward, scale_for_neutrality, ActionSpace, NeutralityCounter, ObservationBundle,
    ObservationSpec, PerformanceMeter, TradeAction,
};

/// Lifecycle of the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvState {
    /// An episode is running
    Ready,
    /// The episode ended (or none has started); reset before stepping
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    First,
    Mid,
    Last,
}

/// What the environment hands back from `reset` and `step`
#[derive(Debug, Clone)]
pub struct TimeStep {
    pub step_type: StepType,
    pub reward: f64,
    pub observation: ObservationBundle,
}

impl TimeStep {
    pub fn is_first(&self) -> bool {
        self.step_type == StepType::First
    }

    pub fn is_last(&self) -> bool {
        self.step_type == StepType::Last
    }
}

/// Trading environment for RL training
pub struct TradingEnvironment {
    config: EnvConfig,
    prices: Arc<dyn PriceSource>,
    clock: MarketClock,
    observer: ObservationBuilder,
    action_space: ActionSpace,
    meter: PerformanceMeter,
    neutrality: NeutralityCounter,
    state: EnvState,
    span: Span,
}

impl TradingEnvironment {
    /// Validate the configuration, check the listing exchange and seed the
    /// clock. The first episode starts with [`TradingEnvironment::reset`].
    pub async fn new(
        config: EnvConfig,
        prices: Arc<dyn PriceSource>,
        news: Arc<dyn NewsSource>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| SentiError::Configuration(errors.join("; ")))?;

        if let Some(expected) = &config.expected_exchange {
            let listed = prices.exchange(&config.symbol).await?;
            if !listed
                .as_deref()
                .is_some_and(|ex| ex.eq_ignore_ascii_case(expected))
            {
                return Err(SentiError::Configuration(format!(
                    "symbol {} is listed on {}, only {} is supported",
                    config.symbol,
                    listed.as_deref().unwrap_or("an unknown exchange"),
                    expected
                )));
            }
        }

        let span = info_span!("env", symbol = %config.symbol);
        let mut clock = MarketClock::new(prices.clone(), &config).with_span(span.clone());
        clock.seed().await?;

        let observer =
            ObservationBuilder::new(prices.clone(), news, tokenizer, &config).with_span(span.clone());

        info!(
            parent: &span,
            start = %clock.start(),
            stop = %clock.stop(),
            neutrality = config.use_neutrality,
            "environment ready"
        );

        Ok(Self {
            action_space: ActionSpace::new(config.use_neutrality),
            meter: PerformanceMeter::new(config.limit_percent, config.limit_steps),
            neutrality: NeutralityCounter::default(),
            state: EnvState::Done,
            config,
            prices,
            clock,
            observer,
            span,
        })
    }

    /// Route this environment's events (and its clock's and builder's) to `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.clock.set_span(span.clone());
        self.observer.set_span(span.clone());
        self.span = span;
        self
    }

    /// Start a new episode at the current cursor
    pub async fn reset(&mut self) -> Result<TimeStep> {
        self.meter.reset();
        let observation = self.observe().await?;
        self.state = EnvState::Ready;

        debug!(parent: &self.span, cursor = %self.clock.cursor(), "episode reset");
        Ok(TimeStep {
            step_type: StepType::First,
            reward: 0.0,
            observation,
        })
    }

    /// Apply `action_index` for one clock step
    pub async fn step(&mut self, action_index: usize) -> Result<TimeStep> {
        if self.state == EnvState::Done {
            if self.config.auto_reset {
                return self.reset().await;
            }
            return Err(SentiError::EpisodeFinished);
        }

        let action = self.action_space.decode(action_index)?;

        let last_price = self.price_at(self.clock.cursor()).await?;
        let cursor = self.clock.advance().await?;
        let current_price = self.price_at(cursor).await?;

        let reward = self.reward(action, last_price, current_price).await?;
        self.meter.accumulate(reward);

        debug!(
            parent: &self.span,
            %action,
            last_price,
            current_price,
            reward,
            percent = self.meter.percent,
            "step"
        );

        let terminal = self.check_termination();
        let observation = self.observe().await?;

        let step_type = if terminal {
            self.state = EnvState::Done;
            info!(
                parent: &self.span,
                steps = self.meter.steps,
                percent = self.meter.percent,
                "episode finished"
            );
            StepType::Last
        } else {
            StepType::Mid
        };

        Ok(TimeStep {
            step_type,
            reward,
            observation,
        })
    }

    /// Latest close at the current cursor
    pub async fn last_price(&self) -> Result<f64> {
        self.price_at(self.clock.cursor()).await
    }

    pub fn action_space(&self) -> ActionSpace {
        self.action_space
    }

    pub fn observation_spec(&self) -> ObservationSpec {
        self.observer.spec()
    }

    pub fn percent(&self) -> f64 {
        self.meter.percent
    }

    pub fn steps(&self) -> usize {
        self.meter.steps
    }

    pub fn cursor(&self) -> DateTime<Utc> {
        self.clock.cursor()
    }

    pub fn state(&self) -> EnvState {
        self.state
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        self.observer.tokenizer()
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn neutrality_count(&self) -> usize {
        self.neutrality.count()
    }

    async fn observe(&self) -> Result<ObservationBundle> {
        self.observer
            .build(&self.config.symbol, self.clock.cursor())
            .await
    }

    async fn price_at(&self, at: DateTime<Utc>) -> Result<f64> {
        let bar = closest_bar(
            self.prices.as_ref(),
            &self.config.symbol,
            at,
            self.config.price_interval,
        )
        .await?;
        Ok(bar.close)
    }

    async fn reward(&mut self, action: TradeAction, last: f64, current: f64) -> Result<f64> {
        if action == TradeAction::Hold {
            self.neutrality.hold();
            return Ok(0.0);
        }

        let mut reward = percent_reward(action, last, current);
        if self.config.neutrality_order == NeutralityOrder::ResetFirst {
            self.neutrality.clear();
        }

        let held = self.neutrality.count();
        if self.config.use_neutrality && held > 0 {
            let closes = window_closes(
                self.prices.as_ref(),
                &self.config.symbol,
                self.clock.cursor(),
                Duration::days(held as i64),
                self.config.price_interval,
            )
            .await?;
            // the `held` closes before the current one
            let end = closes.len().saturating_sub(1);
            let begin = closes.len().saturating_sub(held + 1);
            let scaled = scale_for_neutrality(action, reward, &closes[begin..end], current);
            debug!(parent: &self.span, held, reward, scaled, "neutrality scaling");
            reward = scaled;
        }

        self.neutrality.clear();
        Ok(reward)
    }

    /// Step ceiling, then bust, then end of data. Rewinds the clock when the
    /// episode cannot continue from here.
    fn check_termination(&mut self) -> bool {
        if self.meter.tick() {
            let horizon = self.config.limit_steps.unwrap_or(0);
            if self.clock.would_cross_stop(horizon) {
                self.clock.rewind();
            }
            return true;
        }

        if self.meter.is_bust() {
            self.meter.restore();
            return true;
        }

        if self.clock.would_cross_stop(1) {
            self.clock.rewind();
            return true;
        }

        false
    }
}
