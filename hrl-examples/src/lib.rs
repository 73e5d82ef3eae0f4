//! Shared plumbing of the command line programs: logging setup, console narration, environment
//! selection and the default artifact locations.

use anyhow::{Context, Result};
use candle_core::Tensor;
use clap::Args;
use hrl_api::{DevicePreference, Scenario};
use hrl_core::{
    env::{Env, EnvironmentDescription, SnapShot},
    envs::CartPole,
    evaluation::{EvaluationOptions, EvaluationSummary, run_episodes, summarize},
    policies::Policy,
    report::{Report, ReportSink},
};
use hrl_gym::{GymEnv, RenderMode};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const ARTIFACT_NAME: &str = "lunar_lander_ppo_1M.hrl";
/// Where `train_lunar_lander` writes, relative to the home directory.
pub const TRAINING_OUTPUT_DIR: &str = "hello_rl_models";
/// Where `run_saved_model` looks, relative to the home directory.
pub const LOCAL_MODELS_DIR: &str = "projects/hello_rl/models";

/// Logs to stderr, `info` and up unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .context("cannot locate the home directory, set HOME")
}

pub fn training_output_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(TRAINING_OUTPUT_DIR).join(ARTIFACT_NAME))
}

pub fn local_model_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(LOCAL_MODELS_DIR).join(ARTIFACT_NAME))
}

/// Name of the machine training runs happen on, used in copy instructions.
pub fn training_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "<training-host>".to_owned())
}

pub fn copy_instruction(remote_path: &str) -> String {
    format!(
        "scp {}:{remote_path} ~/{LOCAL_MODELS_DIR}/",
        training_host()
    )
}

/// Flags every program understands.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Seed for training and evaluation resets. Unseeded runs differ every time.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Skip the rendered demonstration.
    #[arg(long)]
    pub no_render: bool,
}

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// `cpu`, or `auto` to use a CUDA device when one is available.
    #[arg(long, default_value_t = DevicePreference::Cpu)]
    pub device: DevicePreference,
}

pub fn banner(title: &str) {
    println!("{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Either a gymnasium environment or the native cart pole.
pub enum EnvKind {
    Gym(GymEnv),
    CartPole(CartPole),
}

impl EnvKind {
    pub fn gym(scenario: Scenario, render_mode: Option<RenderMode>) -> Result<Self> {
        Ok(Self::Gym(GymEnv::new(scenario.gym_id(), render_mode)?))
    }
}

impl Env for EnvKind {
    type Tensor = Tensor;

    fn reset(&mut self, seed: Option<u64>) -> Result<Tensor> {
        match self {
            Self::Gym(env) => env.reset(seed),
            Self::CartPole(env) => env.reset(seed),
        }
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot<Tensor>> {
        match self {
            Self::Gym(env) => env.step(action),
            Self::CartPole(env) => env.step(action),
        }
    }

    fn env_description(&self) -> EnvironmentDescription {
        match self {
            Self::Gym(env) => env.env_description(),
            Self::CartPole(env) => env.env_description(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Gym(env) => env.close(),
            Self::CartPole(env) => env.close(),
        }
    }
}

/// How episodes are narrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narration {
    /// Headless evaluation, optionally with step counts.
    Evaluation { show_steps: bool },
    /// Rendered demonstration.
    Demonstration,
}

/// Prints reports to stdout in the programs' console format.
pub struct ConsoleSink {
    scenario: Scenario,
    narration: Narration,
}

impl ConsoleSink {
    pub fn new(scenario: Scenario, narration: Narration) -> Self {
        Self {
            scenario,
            narration,
        }
    }

    fn episode_line(&self, index: usize, reward: f32, steps: usize, success: bool) -> String {
        let number = index + 1;
        let rendered = self.narration == Narration::Demonstration;
        match (self.scenario.outcome_label(success, rendered), self.narration) {
            (Some(label), Narration::Evaluation { show_steps: true }) => {
                format!("Episode {number}: {label} | Reward: {reward:.2} | Steps: {steps}")
            }
            (Some(label), Narration::Evaluation { show_steps: false }) => {
                format!("Episode {number}: {label} | Reward: {reward:.2}")
            }
            (Some(label), Narration::Demonstration) => {
                format!("Visual episode {number}: {label} | Reward: {reward:.2}")
            }
            (None, Narration::Evaluation { .. }) => {
                format!("Episode {number} finished after {steps} steps, reward: {reward}")
            }
            (None, Narration::Demonstration) => {
                format!("Visual episode finished after {steps} steps")
            }
        }
    }

    fn summary_lines(&self, summary: &EvaluationSummary) -> Vec<String> {
        match summary.success_threshold {
            Some(threshold) => vec![
                "=".repeat(60),
                format!("Average reward: {:.2}", summary.average_reward),
                format!("Best reward: {:.2}", summary.best_reward),
                format!(
                    "Successful landings (>{threshold}): {}/{}",
                    summary.success_count, summary.total_episodes
                ),
                "=".repeat(60),
            ],
            None => vec![
                format!("Completed {} episodes", summary.total_episodes),
                format!("Average episode reward: {:.2}", summary.average_reward),
                format!("Best episode reward: {:.2}", summary.best_reward),
            ],
        }
    }
}

impl ReportSink for ConsoleSink {
    fn report(&mut self, report: Report<'_>) {
        match report {
            Report::Episode { index, outcome } => println!(
                "{}",
                self.episode_line(
                    index,
                    outcome.cumulative_reward,
                    outcome.step_count,
                    outcome.success
                )
            ),
            Report::Summary(summary) => {
                println!();
                for line in self.summary_lines(summary) {
                    println!("{line}");
                }
            }
        }
    }
}

/// Runs `options.episodes` headless episodes, narrates them and their summary.
pub fn evaluate<E, P>(
    env: &mut E,
    policy: &P,
    scenario: Scenario,
    options: &EvaluationOptions,
    show_steps: bool,
) -> Result<EvaluationSummary>
where
    E: Env,
    P: Policy<Tensor = E::Tensor> + ?Sized,
{
    let mut sink = ConsoleSink::new(scenario, Narration::Evaluation { show_steps });
    let outcomes = run_episodes(env, policy, options, &mut sink)?;
    let summary = summarize(&outcomes, options.success_threshold)?;
    sink.report(Report::Summary(&summary));
    Ok(summary)
}

/// Plays `episodes` episodes in a window. The window is closed even when an episode fails.
pub fn demonstrate<P>(
    scenario: Scenario,
    policy: &P,
    episodes: usize,
    seed: Option<u64>,
) -> Result<()>
where
    P: Policy<Tensor = Tensor> + ?Sized,
{
    println!();
    banner("Running visual demonstration...\nClose the window to exit");
    println!();
    let mut env = GymEnv::new(scenario.gym_id(), Some(RenderMode::Human))?;
    let options = scenario.evaluation_options(episodes).with_seed(seed);
    let mut sink = ConsoleSink::new(scenario, Narration::Demonstration);
    let played = run_episodes(&mut env, policy, &options, &mut sink);
    env.close()?;
    played.map(|_| ())
}
