//! Experience collection: policies stepping the environment and handing
//! each transition to observers and a sink.

use burn::optim::Optimizer;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info_span, Span};

use crate::error::Result;
use crate::rl::algorithms::DqnAgent;
use crate::rl::core::ObservationBundle;
use crate::rl::environment::{EnvState, TimeStep, TradingEnvironment};
use crate::rl::memory::Transition;
use crate::rl::networks::TradingQNetwork;

/// Chooses an action index from an observation
pub trait Policy {
    fn act(&mut self, observation: &ObservationBundle) -> Result<usize>;
}

/// Uniform over the action space
#[derive(Debug)]
pub struct RandomPolicy {
    num_actions: usize,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(num_actions: usize, seed: u64) -> Self {
        Self {
            num_actions: num_actions.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _observation: &ObservationBundle) -> Result<usize> {
        Ok(self.rng.gen_range(0..self.num_actions))
    }
}

/// Epsilon-greedy collection through the agent
impl<B, O> Policy for DqnAgent<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TradingQNetwork<B>, B>,
{
    fn act(&mut self, observation: &ObservationBundle) -> Result<usize> {
        self.collect_action(observation)
    }
}

/// Greedy view of an agent, used for evaluation
pub struct GreedyPolicy<'a, B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TradingQNetwork<B>, B>,
{
    agent: &'a DqnAgent<B, O>,
}

impl<'a, B, O> GreedyPolicy<'a, B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TradingQNetwork<B>, B>,
{
    pub fn new(agent: &'a DqnAgent<B, O>) -> Self {
        Self { agent }
    }
}

impl<B, O> Policy for GreedyPolicy<'_, B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TradingQNetwork<B>, B>,
{
    fn act(&mut self, observation: &ObservationBundle) -> Result<usize> {
        self.agent.greedy_action(observation)
    }
}

/// Sees every transition before it is stored
pub trait TransitionObserver {
    fn observe(&mut self, transition: &Transition);
}

/// What one `run` produced
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverStats {
    pub steps: usize,
    pub episodes_finished: usize,
    pub total_reward: f64,
}

/// Steps an environment with a policy, continuing the current episode
/// across calls
pub struct CollectDriver {
    current: Option<TimeStep>,
    span: Span,
}

impl Default for CollectDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectDriver {
    pub fn new() -> Self {
        Self {
            current: None,
            span: info_span!("collect"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Forget the in-flight episode; the next run starts with a reset
    pub fn restart(&mut self) {
        self.current = None;
    }

    pub async fn run<P, S>(
        &mut self,
        env: &mut TradingEnvironment,
        policy: &mut P,
        steps: usize,
        observers: &mut [&mut dyn TransitionObserver],
        sink: &mut S,
    ) -> Result<DriverStats>
    where
        P: Policy + ?Sized,
        S: Extend<Transition>,
    {
        let mut stats = DriverStats::default();

        for _ in 0..steps {
            let time_step = match self.current.take() {
                Some(ts) if env.state() == EnvState::Ready => ts,
                _ => env.reset().await?,
            };

            let action = policy.act(&time_step.observation)?;
            let next = env.step(action).await?;
            let done = next.is_last();

            let transition = Transition {
                observation: time_step.observation,
                action,
                reward: next.reward as f32,
                next_observation: next.observation.clone(),
                done,
            };
            for observer in observers.iter_mut() {
                observer.observe(&transition);
            }
            sink.extend(std::iter::once(transition));

            stats.steps += 1;
            stats.total_reward += next.reward;
            if done {
                stats.episodes_finished += 1;
                self.current = None;
            } else {
                self.current = Some(next);
            }
        }

        debug!(
            parent: &self.span,
            steps = stats.steps,
            episodes = stats.episodes_finished,
            total_reward = stats.total_reward,
            "collection finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_policy_stays_in_range() {
        let mut policy = RandomPolicy::new(3, 1);
        let observation = ObservationBundle::zeros(1);
        for _ in 0..100 {
            assert!(policy.act(&observation).unwrap() < 3);
        }
    }

    #[test]
    fn test_random_policy_is_seeded() {
        let observation = ObservationBundle::zeros(1);
        let mut a = RandomPolicy::new(2, 9);
        let mut b = RandomPolicy::new(2, 9);
        let left: Vec<usize> = (0..20).map(|_| a.act(&observation).unwrap()).collect();
        let right: Vec<usize> = (0..20).map(|_| b.act(&observation).unwrap()).collect();
        assert_eq!(left, right);
    }
}
