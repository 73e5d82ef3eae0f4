//! Long PPO training run on LunarLander meant for a machine with a GPU. Saves the artifact that
//! `run_saved_model` evaluates elsewhere.

use anyhow::Result;
use clap::Parser;
use hrl_agents::ppo::PPOParams;
use hrl_api::{DevicePreference, Model, Scenario, builders::ppo::PPOBuilder};
use hrl_core::env::Env;
use hrl_examples::{
    EnvKind, banner, copy_instruction, evaluate, init_tracing, training_output_path,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Train PPO on LunarLander-v3 and save the model")]
struct Args {
    #[arg(long, default_value_t = 1_000_000)]
    total_steps: usize,
    /// Number of evaluation episodes after training.
    #[arg(long, default_value_t = 10)]
    episodes: usize,
    /// Artifact destination, defaults to ~/hello_rl_models/lunar_lander_ppo_1M.hrl
    #[arg(long)]
    output: Option<PathBuf>,
    /// `cpu`, or `auto` to use a CUDA device when one is available.
    #[arg(long, default_value_t = DevicePreference::AcceleratorPreferred)]
    device: DevicePreference,
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let scenario = Scenario::LunarLander;

    let device = args.device.resolve()?;
    banner(&format!(
        "Device Setup Check\nRequested: {}\nUsing: {:?}\nCUDA available: {}",
        args.device,
        device,
        candle_core::utils::cuda_is_available()
    ));
    if args.device == DevicePreference::AcceleratorPreferred && device.is_cpu() {
        tracing::warn!("no CUDA device available, training on the CPU");
    }

    println!("\nCreating LunarLander environment...");
    let mut env = EnvKind::gym(scenario, None)?;
    let description = env.env_description();
    println!("\nEnvironment Info:");
    println!("Observation space: {}", description.observation_space);
    println!("Action space: {}", description.action_space);

    println!();
    banner(&format!(
        "Training PPO agent for {} timesteps",
        args.total_steps
    ));
    println!();
    let builder = PPOBuilder {
        params: PPOParams {
            learning_rate: 3e-4,
            n_steps: 2048,
            batch_size: 64,
            n_epochs: 4,
            gamma: 0.999,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut model = Model::ppo(&builder, &description, &device)?;
    let trained = model.learn(&mut env, args.total_steps, args.seed);
    env.close()?;
    trained?;
    println!();
    banner("Training complete!");

    let output = match args.output {
        Some(output) => output,
        None => training_output_path()?,
    };
    model.save(&output)?;
    println!("\nModel saved to: {}", output.display());

    println!("\nQuick evaluation ({} episodes)...", args.episodes);
    let mut test_env = EnvKind::gym(scenario, None)?;
    let options = scenario.evaluation_options(args.episodes).with_seed(args.seed);
    let evaluated = evaluate(&mut test_env, &model, scenario, &options, false);
    test_env.close()?;
    evaluated?;

    println!("\nTo download the model to your local machine:");
    println!("{}", copy_instruction(&output.display().to_string()));
    Ok(())
}
