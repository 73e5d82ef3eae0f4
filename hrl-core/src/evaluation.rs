//! Episode rollouts against a fixed policy and their aggregation.
//!
//! Nothing here learns. The driver resets, asks the policy for an action, steps the environment
//! until it terminates or truncates, and records what happened. Narration is delegated to a
//! [`ReportSink`].

use crate::{
    env::Env,
    error::CoreError,
    policies::Policy,
    report::{Report, ReportSink},
};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    pub cumulative_reward: f32,
    pub step_count: usize,
    pub success: bool,
}

impl EpisodeOutcome {
    pub fn new(cumulative_reward: f32, step_count: usize, success_threshold: Option<f32>) -> Self {
        Self {
            cumulative_reward,
            step_count,
            success: success_threshold.is_some_and(|t| cumulative_reward >= t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSummary {
    pub average_reward: f32,
    pub best_reward: f32,
    pub success_count: usize,
    pub total_episodes: usize,
    /// The threshold the outcomes were classified with, `None` when success is not tracked.
    pub success_threshold: Option<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct EvaluationOptions {
    pub episodes: usize,
    pub deterministic: bool,
    /// Episode `i` is reset with `seed + i`. Unseeded runs are not reproducible.
    pub seed: Option<u64>,
    pub success_threshold: Option<f32>,
}

impl EvaluationOptions {
    pub fn new(episodes: usize) -> Self {
        Self {
            episodes,
            deterministic: true,
            seed: None,
            success_threshold: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_success_threshold(mut self, threshold: Option<f32>) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    fn episode_seed(&self, episode: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(episode as u64))
    }
}

fn play_episode<E, P>(
    env: &mut E,
    policy: &P,
    deterministic: bool,
    seed: Option<u64>,
    success_threshold: Option<f32>,
) -> Result<EpisodeOutcome>
where
    E: Env,
    P: Policy<Tensor = E::Tensor> + ?Sized,
{
    let mut state = env.reset(seed)?;
    let mut cumulative_reward = 0f32;
    let mut step_count = 0;
    loop {
        let action = policy.predict(&state, deterministic)?;
        let snapshot = env.step(&action)?;
        cumulative_reward += snapshot.reward;
        step_count += 1;
        if snapshot.done() {
            return Ok(EpisodeOutcome::new(
                cumulative_reward,
                step_count,
                success_threshold,
            ));
        }
        state = snapshot.state;
    }
}

/// Plays exactly `options.episodes` episodes and returns their outcomes in call order.
pub fn run_episodes<E, P>(
    env: &mut E,
    policy: &P,
    options: &EvaluationOptions,
    sink: &mut dyn ReportSink,
) -> Result<Vec<EpisodeOutcome>>
where
    E: Env,
    P: Policy<Tensor = E::Tensor> + ?Sized,
{
    if options.episodes == 0 {
        return Err(CoreError::NoEpisodes.into());
    }
    let mut outcomes = Vec::with_capacity(options.episodes);
    for index in 0..options.episodes {
        let outcome = play_episode(
            env,
            policy,
            options.deterministic,
            options.episode_seed(index),
            options.success_threshold,
        )?;
        sink.report(Report::Episode {
            index,
            outcome: &outcome,
        });
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Steps the environment `total_steps` times, starting a new episode whenever one ends. Only
/// completed episodes are returned, a trailing partial episode is dropped. `options.episodes` is
/// ignored.
pub fn run_for_steps<E, P>(
    env: &mut E,
    policy: &P,
    options: &EvaluationOptions,
    total_steps: usize,
    sink: &mut dyn ReportSink,
) -> Result<Vec<EpisodeOutcome>>
where
    E: Env,
    P: Policy<Tensor = E::Tensor> + ?Sized,
{
    let mut outcomes = vec![];
    let mut state = env.reset(options.episode_seed(0))?;
    let mut cumulative_reward = 0f32;
    let mut step_count = 0;
    for _ in 0..total_steps {
        let action = policy.predict(&state, options.deterministic)?;
        let snapshot = env.step(&action)?;
        cumulative_reward += snapshot.reward;
        step_count += 1;
        if snapshot.done() {
            let outcome =
                EpisodeOutcome::new(cumulative_reward, step_count, options.success_threshold);
            sink.report(Report::Episode {
                index: outcomes.len(),
                outcome: &outcome,
            });
            outcomes.push(outcome);
            cumulative_reward = 0.;
            step_count = 0;
            state = env.reset(options.episode_seed(outcomes.len()))?;
        } else {
            state = snapshot.state;
        }
    }
    Ok(outcomes)
}

/// Mean and best reward plus the number of episodes reaching `success_threshold`. Successes are
/// counted against the threshold given here, not the one the outcomes were classified with.
pub fn summarize(
    outcomes: &[EpisodeOutcome],
    success_threshold: Option<f32>,
) -> std::result::Result<EvaluationSummary, CoreError> {
    if outcomes.is_empty() {
        return Err(CoreError::EmptyEvaluation);
    }
    let total_reward: f32 = outcomes.iter().map(|o| o.cumulative_reward).sum();
    let best_reward = outcomes
        .iter()
        .map(|o| o.cumulative_reward)
        .fold(f32::NEG_INFINITY, f32::max);
    Ok(EvaluationSummary {
        average_reward: total_reward / outcomes.len() as f32,
        best_reward,
        success_count: outcomes
            .iter()
            .filter(|o| success_threshold.is_some_and(|t| o.cumulative_reward >= t))
            .count(),
        total_episodes: outcomes.len(),
        success_threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::{EnvironmentDescription, SnapShot, Space},
        report::NullSink,
    };
    use std::cell::RefCell;

    /// Terminates after `episode_length` steps, rewarding each step with its index.
    struct CountingEnv {
        episode_length: usize,
        truncate: bool,
        t: usize,
        total_steps: usize,
        seeds: Vec<Option<u64>>,
    }

    impl CountingEnv {
        fn new(episode_length: usize) -> Self {
            Self {
                episode_length,
                truncate: false,
                t: 0,
                total_steps: 0,
                seeds: vec![],
            }
        }
    }

    impl Env for CountingEnv {
        type Tensor = f32;

        fn reset(&mut self, seed: Option<u64>) -> Result<f32> {
            self.seeds.push(seed);
            self.t = 0;
            Ok(0.)
        }

        fn step(&mut self, _action: &f32) -> Result<SnapShot<f32>> {
            self.t += 1;
            self.total_steps += 1;
            let end = self.t == self.episode_length;
            Ok(SnapShot {
                state: self.t as f32,
                reward: self.t as f32,
                terminated: end && !self.truncate,
                truncated: end && self.truncate,
            })
        }

        fn env_description(&self) -> EnvironmentDescription {
            EnvironmentDescription::new(Space::continous_from_dims(vec![1]), Space::Discrete(1))
        }
    }

    struct ConstantPolicy {
        calls: RefCell<Vec<bool>>,
    }

    impl Policy for ConstantPolicy {
        type Tensor = f32;

        fn predict(&self, _observation: &f32, deterministic: bool) -> Result<f32> {
            self.calls.borrow_mut().push(deterministic);
            Ok(0.)
        }
    }

    fn policy() -> ConstantPolicy {
        ConstantPolicy {
            calls: RefCell::new(vec![]),
        }
    }

    fn outcome(reward: f32, threshold: Option<f32>) -> EpisodeOutcome {
        EpisodeOutcome::new(reward, 1, threshold)
    }

    #[test]
    fn produces_one_outcome_per_requested_episode() -> Result<()> {
        let mut env = CountingEnv::new(3);
        let outcomes = run_episodes(&mut env, &policy(), &EvaluationOptions::new(7), &mut NullSink)?;
        assert_eq!(outcomes.len(), 7);
        assert!(outcomes.iter().all(|o| o.step_count == 3));
        Ok(())
    }

    #[test]
    fn stops_stepping_at_termination() -> Result<()> {
        let mut env = CountingEnv::new(5);
        let outcomes = run_episodes(&mut env, &policy(), &EvaluationOptions::new(1), &mut NullSink)?;
        assert_eq!(outcomes[0].step_count, 5);
        assert_eq!(outcomes[0].cumulative_reward, 15.);
        assert_eq!(env.total_steps, 5);
        Ok(())
    }

    #[test]
    fn truncation_ends_the_episode() -> Result<()> {
        let mut env = CountingEnv::new(4);
        env.truncate = true;
        let outcomes = run_episodes(&mut env, &policy(), &EvaluationOptions::new(2), &mut NullSink)?;
        assert_eq!(env.total_steps, 8);
        assert_eq!(outcomes[1].step_count, 4);
        Ok(())
    }

    #[test]
    fn zero_episodes_is_rejected() {
        let mut env = CountingEnv::new(5);
        let err = run_episodes(&mut env, &policy(), &EvaluationOptions::new(0), &mut NullSink)
            .unwrap_err();
        assert_eq!(err.downcast_ref::<CoreError>(), Some(&CoreError::NoEpisodes));
        assert!(env.seeds.is_empty());
    }

    #[test]
    fn seeds_are_offset_by_episode_index() -> Result<()> {
        let mut env = CountingEnv::new(2);
        let options = EvaluationOptions::new(3).with_seed(Some(10));
        run_episodes(&mut env, &policy(), &options, &mut NullSink)?;
        assert_eq!(env.seeds, vec![Some(10), Some(11), Some(12)]);
        Ok(())
    }

    #[test]
    fn unseeded_runs_leave_seeding_to_the_env() -> Result<()> {
        let mut env = CountingEnv::new(2);
        run_episodes(&mut env, &policy(), &EvaluationOptions::new(2), &mut NullSink)?;
        assert_eq!(env.seeds, vec![None, None]);
        Ok(())
    }

    #[test]
    fn deterministic_flag_reaches_the_policy() -> Result<()> {
        let mut env = CountingEnv::new(2);
        let policy = policy();
        let options = EvaluationOptions::new(1).with_deterministic(false);
        run_episodes(&mut env, &policy, &options, &mut NullSink)?;
        assert_eq!(*policy.calls.borrow(), vec![false, false]);
        Ok(())
    }

    #[test]
    fn every_outcome_is_reported() -> Result<()> {
        let mut env = CountingEnv::new(2);
        let mut seen = vec![];
        let mut sink = |report: Report<'_>| {
            if let Report::Episode { index, outcome } = report {
                seen.push((index, outcome.step_count));
            }
        };
        run_episodes(&mut env, &policy(), &EvaluationOptions::new(3), &mut sink)?;
        assert_eq!(seen, vec![(0, 2), (1, 2), (2, 2)]);
        Ok(())
    }

    #[test]
    fn step_budget_drops_the_partial_episode() -> Result<()> {
        let mut env = CountingEnv::new(4);
        let outcomes = run_for_steps(
            &mut env,
            &policy(),
            &EvaluationOptions::new(1),
            10,
            &mut NullSink,
        )?;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(env.total_steps, 10);
        assert_eq!(env.seeds.len(), 3);
        Ok(())
    }

    #[test]
    fn step_budget_reports_completed_episodes_only() -> Result<()> {
        let mut env = CountingEnv::new(3);
        let mut seen = vec![];
        let mut sink = |report: Report<'_>| {
            if let Report::Episode { index, outcome } = report {
                seen.push((index, outcome.cumulative_reward));
            }
        };
        let options = EvaluationOptions::new(1).with_seed(Some(4));
        let outcomes = run_for_steps(&mut env, &policy(), &options, 7, &mut sink)?;
        assert_eq!(seen, vec![(0, 6.), (1, 6.)]);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(env.seeds, vec![Some(4), Some(5), Some(6)]);
        Ok(())
    }

    #[test]
    fn summary_matches_hand_computation() -> Result<()> {
        let threshold = Some(200.);
        let outcomes = [
            outcome(100., threshold),
            outcome(250., threshold),
            outcome(300., threshold),
        ];
        let summary = summarize(&outcomes, threshold)?;
        assert!((summary.average_reward - 216.666_67).abs() < 1e-3);
        assert_eq!(summary.best_reward, 300.);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.total_episodes, 3);
        Ok(())
    }

    #[test]
    fn summary_counts_against_its_own_threshold() -> Result<()> {
        let outcomes = [outcome(100., None), outcome(250., None), outcome(300., None)];
        let summary = summarize(&outcomes, Some(200.))?;
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.success_threshold, Some(200.));
        assert_eq!(summarize(&outcomes, Some(275.))?.success_count, 1);
        Ok(())
    }

    #[test]
    fn reward_equal_to_threshold_is_a_success() {
        assert!(outcome(200., Some(200.)).success);
        assert!(!outcome(199.99, Some(200.)).success);
    }

    #[test]
    fn no_threshold_means_no_successes() -> Result<()> {
        let outcomes = [outcome(500., None), outcome(20., None)];
        let summary = summarize(&outcomes, None)?;
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.best_reward, 500.);
        Ok(())
    }

    #[test]
    fn summary_of_negative_rewards_keeps_the_best() -> Result<()> {
        let outcomes = [outcome(-120., None), outcome(-30., None)];
        assert_eq!(summarize(&outcomes, None)?.best_reward, -30.);
        Ok(())
    }

    #[test]
    fn empty_summary_is_rejected() {
        assert_eq!(summarize(&[], Some(200.)), Err(CoreError::EmptyEvaluation));
    }
}
