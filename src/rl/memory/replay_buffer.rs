//! Replay Buffer
//!
//! Experience replay buffer for off-policy learning.

use rand::seq::index;
use rand::Rng;
use std::collections::VecDeque;

use crate::rl::core::ObservationBundle;

/// A single transition in the environment.
///
/// Owned: the driver moves it into the buffer and keeps no reference.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Observation the action was chosen from
    pub observation: ObservationBundle,
    /// Action index
    pub action: usize,
    pub reward: f32,
    pub next_observation: ObservationBundle,
    /// Whether the step ended the episode
    pub done: bool,
}

/// Fixed-capacity ring of transitions; the oldest is dropped when full
#[derive(Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Up to `batch_size` distinct transitions chosen uniformly
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&Transition> {
        let amount = batch_size.min(self.buffer.len());
        index::sample(rng, self.buffer.len(), amount)
            .into_iter()
            .map(|i| &self.buffer[i])
            .collect()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn has_enough_samples(&self, min_samples: usize) -> bool {
        self.buffer.len() >= min_samples
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}

impl Extend<Transition> for ReplayBuffer {
    fn extend<T: IntoIterator<Item = Transition>>(&mut self, iter: T) {
        for transition in iter {
            self.push(transition);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn transition(action: usize, reward: f32) -> Transition {
        Transition {
            observation: ObservationBundle::zeros(1),
            action,
            reward,
            next_observation: ObservationBundle::zeros(1),
            done: false,
        }
    }

    #[test]
    fn test_ring_drops_oldest() {
        let mut buffer = ReplayBuffer::new(3);
        for i in 0..5 {
            buffer.push(transition(0, i as f32));
        }
        assert_eq!(buffer.len(), 3);
        let rewards: Vec<f32> = buffer.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sample_is_distinct_and_bounded() {
        let mut buffer = ReplayBuffer::new(10);
        buffer.extend((0..10).map(|i| transition(i % 2, i as f32)));
        let mut rng = StdRng::seed_from_u64(7);

        let batch = buffer.sample(4, &mut rng);
        assert_eq!(batch.len(), 4);
        let mut rewards: Vec<i32> = batch.iter().map(|t| t.reward as i32).collect();
        rewards.sort();
        rewards.dedup();
        assert_eq!(rewards.len(), 4);

        assert_eq!(buffer.sample(50, &mut rng).len(), 10);
    }

    #[test]
    fn test_has_enough_samples() {
        let mut buffer = ReplayBuffer::new(5);
        assert!(buffer.is_empty());
        buffer.push(transition(1, 1.0));
        assert!(buffer.has_enough_samples(1));
        assert!(!buffer.has_enough_samples(2));
        buffer.clear();
        assert_eq!(buffer.capacity(), 5);
    }
}
