use crate::{
    Algorithm,
    agents::Agent,
    env::Env,
    sampler::{EpisodeStats, StepBoundSampler},
    utils::rollout_buffer::RolloutBuffer,
};
use anyhow::Result;
use candle_core::Tensor;

macro_rules! break_on_hook_res {
    ($hook_res:expr) => {
        if $hook_res {
            break;
        }
    };
}

/// Stops training once at least `total_steps` environment steps were collected.
#[derive(Debug, Clone, Copy)]
pub struct LearningSchedule {
    total_steps: usize,
    current_step: usize,
}

impl LearningSchedule {
    pub fn total_step_bound(total_steps: usize) -> Self {
        Self {
            total_steps,
            current_step: 0,
        }
    }

    /// Accounts for one rollout of `rollout_steps` steps, returns whether the schedule is over.
    pub fn advance(&mut self, rollout_steps: usize) -> bool {
        self.current_step += rollout_steps;
        self.is_done()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn is_done(&self) -> bool {
        self.current_step >= self.total_steps
    }
}

/// Every hook returns whether training should stop right away.
pub trait OnPolicyAlgorithmHooks {
    fn init_hook(&mut self) -> bool;

    fn post_rollout_hook(&mut self, rollout: &RolloutBuffer, stats: &EpisodeStats) -> bool;

    fn post_training_hook(&mut self) -> bool;

    fn shutdown_hook(&mut self) -> Result<()>;
}

/// Runs until the learning schedule is exhausted and logs progress after every rollout.
pub struct DefaultOnPolicyAlgorithmHooks {
    rollout_idx: usize,
    learning_schedule: LearningSchedule,
}

impl DefaultOnPolicyAlgorithmHooks {
    pub fn new(learning_schedule: LearningSchedule) -> Self {
        Self {
            rollout_idx: 0,
            learning_schedule,
        }
    }
}

impl OnPolicyAlgorithmHooks for DefaultOnPolicyAlgorithmHooks {
    fn init_hook(&mut self) -> bool {
        self.learning_schedule.is_done()
    }

    fn post_rollout_hook(&mut self, rollout: &RolloutBuffer, stats: &EpisodeStats) -> bool {
        self.learning_schedule.advance(rollout.len());
        tracing::info!(
            rollout = self.rollout_idx,
            timesteps = self.learning_schedule.current_step(),
            episodes = stats.finished,
            mean_episode_reward = stats.mean_reward(),
            "rollout collected"
        );
        self.rollout_idx += 1;
        false
    }

    fn post_training_hook(&mut self) -> bool {
        self.learning_schedule.is_done()
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        tracing::debug!(rollouts = self.rollout_idx, "training finished");
        Ok(())
    }
}

pub struct OnPolicyAlgorithm<E: Env<Tensor = Tensor>, A: Agent, H: OnPolicyAlgorithmHooks> {
    pub sampler: StepBoundSampler<E>,
    pub agent: A,
    pub hooks: H,
}

impl<E: Env<Tensor = Tensor>, A: Agent, H: OnPolicyAlgorithmHooks> Algorithm
    for OnPolicyAlgorithm<E, A, H>
{
    fn train(&mut self) -> Result<()> {
        if self.hooks.init_hook() {
            return self.hooks.shutdown_hook();
        }
        loop {
            // rollout phase
            let rollout = self.sampler.collect_rollout(self.agent.distribution())?;
            break_on_hook_res!(
                self.hooks
                    .post_rollout_hook(&rollout, self.sampler.stats())
            );

            // learning phase
            self.agent.learn(rollout)?;
            break_on_hook_res!(self.hooks.post_training_hook());
        }
        self.hooks.shutdown_hook()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_bound_schedule_counts_steps() {
        let mut schedule = LearningSchedule::total_step_bound(10);
        assert!(!schedule.advance(4));
        assert!(!schedule.advance(4));
        assert!(schedule.advance(4));
        assert!(schedule.is_done());
        assert_eq!(schedule.current_step(), 12);
    }

    #[test]
    fn zero_step_schedule_is_done_before_it_starts() {
        let mut hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::total_step_bound(0));
        assert!(hooks.init_hook());
    }
}
