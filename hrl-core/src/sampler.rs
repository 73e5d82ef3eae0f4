use crate::{
    distributions::Distribution,
    env::Env,
    utils::rollout_buffer::RolloutBuffer,
};
use anyhow::Result;
use candle_core::Tensor;
use std::collections::VecDeque;

const STATS_WINDOW: usize = 100;

/// Rewards of the most recently finished episodes, oldest first.
#[derive(Debug, Default, Clone)]
pub struct EpisodeStats {
    pub finished: usize,
    recent_rewards: VecDeque<f32>,
}

impl EpisodeStats {
    fn record(&mut self, reward: f32) {
        self.finished += 1;
        if self.recent_rewards.len() == STATS_WINDOW {
            self.recent_rewards.pop_front();
        }
        self.recent_rewards.push_back(reward);
    }

    /// Mean over the last hundred episodes, `None` before the first one finishes.
    pub fn mean_reward(&self) -> Option<f32> {
        if self.recent_rewards.is_empty() {
            return None;
        }
        Some(self.recent_rewards.iter().sum::<f32>() / self.recent_rewards.len() as f32)
    }
}

/// Collects fixed-length rollouts from a single environment. Episodes continue across rollout
/// boundaries, the environment is only reset when one ends.
pub struct StepBoundSampler<E: Env<Tensor = Tensor>> {
    env: E,
    n_steps: usize,
    seed: Option<u64>,
    last_state: Option<Tensor>,
    episode_reward: f32,
    stats: EpisodeStats,
}

impl<E: Env<Tensor = Tensor>> StepBoundSampler<E> {
    /// `seed` is only applied to the first reset, later episodes draw from the environment's own
    /// generator.
    pub fn new(env: E, n_steps: usize, seed: Option<u64>) -> Self {
        Self {
            env,
            n_steps: n_steps.max(1),
            seed,
            last_state: None,
            episode_reward: 0.,
            stats: EpisodeStats::default(),
        }
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    fn current_state(&mut self) -> Result<Tensor> {
        match self.last_state.take() {
            Some(state) => Ok(state),
            None => self.env.reset(self.seed.take()),
        }
    }

    pub fn collect_rollout<D: Distribution + ?Sized>(
        &mut self,
        distribution: &D,
    ) -> Result<RolloutBuffer> {
        let mut rollout = RolloutBuffer::default();
        let mut state = self.current_state()?;
        for _ in 0..self.n_steps {
            let (action, logp) = distribution.get_action(&state)?;
            let snapshot = self.env.step(&action)?;
            let done = snapshot.done();
            self.episode_reward += snapshot.reward;
            rollout.push_step(state, action, snapshot.reward, done, logp);
            state = if done {
                self.stats.record(self.episode_reward);
                self.episode_reward = 0.;
                self.env.reset(None)?
            } else {
                snapshot.state
            };
        }
        rollout.push_state(state.clone());
        self.last_state = Some(state);
        Ok(rollout)
    }

    pub fn into_env(self) -> E {
        self.env
    }
}
