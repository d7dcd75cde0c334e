//! Training Loop
//!
//! Random warm-up collection followed by collect / sample / train
//! iterations with periodic greedy evaluation.

use burn::optim::Optimizer;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, info_span, Span};

use super::driver::{CollectDriver, GreedyPolicy, Policy, RandomPolicy, TransitionObserver};
use super::metrics::{MetricSnapshot, TradingMetric};
use crate::error::{Result, SentiError};
use crate::rl::algorithms::DqnAgent;
use crate::rl::config::TrainingConfig;
use crate::rl::environment::TradingEnvironment;
use crate::rl::memory::ReplayBuffer;
use crate::rl::networks::TradingQNetwork;

/// Outcome of [`Trainer::run`]
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Loss of every training iteration
    pub losses: Vec<f32>,
    /// Average return of each evaluation, the first taken before training
    pub returns: Vec<f64>,
    /// Average episode length of each evaluation
    pub eval_steps: Vec<f64>,
    /// Reward statistics of the collected experience
    pub metric: MetricSnapshot,
}

pub struct Trainer {
    config: TrainingConfig,
    metric: TradingMetric,
    span: Span,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| SentiError::Configuration(errors.join("; ")))?;

        let mut metric = TradingMetric::new();
        if let Some(path) = &config.metrics_csv {
            metric = metric.with_csv(path);
        }

        Ok(Self {
            config,
            metric,
            span: info_span!("trainer"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub async fn run<B, O>(
        &mut self,
        env: &mut TradingEnvironment,
        agent: &mut DqnAgent<B, O>,
    ) -> Result<TrainingReport>
    where
        B: AutodiffBackend,
        O: Optimizer<TradingQNetwork<B>, B>,
    {
        let seed = agent.config().seed;
        let batch_size = agent.config().batch_size;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut buffer = ReplayBuffer::new(self.config.replay_capacity);
        let mut driver = CollectDriver::new().with_span(self.span.clone());

        info!(
            parent: &self.span,
            initial_collect_steps = self.config.initial_collect_steps,
            num_iterations = self.config.num_iterations,
            "initial collection"
        );
        let mut random = RandomPolicy::new(agent.num_actions(), seed);
        driver
            .run(
                env,
                &mut random,
                self.config.initial_collect_steps,
                &mut [],
                &mut buffer,
            )
            .await?;

        let (avg_return, avg_steps) = compute_avg_return(
            env,
            &mut GreedyPolicy::new(agent),
            self.config.num_eval_episodes,
            self.config.max_eval_steps,
        )
        .await?;
        let mut report = TrainingReport {
            losses: Vec::with_capacity(self.config.num_iterations),
            returns: vec![avg_return],
            eval_steps: vec![avg_steps],
            metric: self.metric.snapshot(),
        };
        // evaluation leaves the environment mid-episode
        driver.restart();

        for iteration in 1..=self.config.num_iterations {
            {
                let mut observers: [&mut dyn TransitionObserver; 1] = [&mut self.metric];
                driver
                    .run(
                        env,
                        agent,
                        self.config.collect_steps_per_iteration,
                        &mut observers,
                        &mut buffer,
                    )
                    .await?;
            }

            let batch = buffer.sample(batch_size, &mut rng);
            let loss = agent.train(&batch)?;
            report.losses.push(loss);

            if iteration % self.config.log_interval == 0 {
                let metric = self.metric.result()?;
                info!(
                    parent: &self.span,
                    iteration,
                    loss,
                    epsilon = agent.epsilon(),
                    tot_reward = metric.tot_reward,
                    avg_reward = metric.avg_reward,
                    "training"
                );
            }

            if iteration % self.config.eval_interval == 0 {
                let (avg_return, avg_steps) = compute_avg_return(
                    env,
                    &mut GreedyPolicy::new(agent),
                    self.config.num_eval_episodes,
                    self.config.max_eval_steps,
                )
                .await?;
                driver.restart();
                info!(parent: &self.span, iteration, avg_return, avg_steps, "evaluation");
                report.returns.push(avg_return);
                report.eval_steps.push(avg_steps);
            }
        }

        report.metric = self.metric.snapshot();
        debug!(
            parent: &self.span,
            iterations = report.losses.len(),
            buffered = buffer.len(),
            "training finished"
        );
        Ok(report)
    }
}

/// Average undiscounted return and episode length of `policy`.
///
/// Each episode starts with a reset and stops at its last step or after
/// `max_steps` steps, whichever comes first.
pub async fn compute_avg_return<P>(
    env: &mut TradingEnvironment,
    policy: &mut P,
    episodes: usize,
    max_steps: usize,
) -> Result<(f64, f64)>
where
    P: Policy + ?Sized,
{
    if episodes == 0 {
        return Ok((0.0, 0.0));
    }

    let mut total_return = 0.0;
    let mut total_steps = 0usize;

    for _ in 0..episodes {
        let mut time_step = env.reset().await?;
        let mut steps = 0;
        while !time_step.is_last() && steps < max_steps {
            let action = policy.act(&time_step.observation)?;
            time_step = env.step(action).await?;
            total_return += time_step.reward;
            steps += 1;
        }
        total_steps += steps;
    }

    Ok((
        total_return / episodes as f64,
        total_steps as f64 / episodes as f64,
    ))
}
