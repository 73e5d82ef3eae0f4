//! Trains PPO on LunarLander, evaluates it and shows a few landings.

use anyhow::Result;
use clap::Parser;
use hrl_agents::ppo::PPOParams;
use hrl_api::{Model, Scenario, builders::ppo::PPOBuilder};
use hrl_core::env::Env;
use hrl_examples::{CommonArgs, DeviceArgs, EnvKind, demonstrate, evaluate, init_tracing};

#[derive(Debug, Parser)]
#[command(about = "Train a PPO agent on LunarLander-v3")]
struct Args {
    #[arg(long, default_value_t = 200_000)]
    total_steps: usize,
    /// Number of headless evaluation episodes.
    #[arg(long, default_value_t = 10)]
    episodes: usize,
    /// Number of rendered episodes.
    #[arg(long, default_value_t = 3)]
    visual_episodes: usize,
    #[command(flatten)]
    device: DeviceArgs,
    #[command(flatten)]
    common: CommonArgs,
}

fn lunar_lander_ppo() -> PPOBuilder {
    PPOBuilder {
        params: PPOParams {
            learning_rate: 3e-4,
            n_steps: 1024,
            batch_size: 64,
            n_epochs: 4,
            gamma: 0.999,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let scenario = Scenario::LunarLander;
    let seed = args.common.seed;

    println!("Creating LunarLander environment...");
    let mut env = EnvKind::gym(scenario, None)?;
    let description = env.env_description();
    println!("\nEnvironment Info:");
    println!("Observation space: {}", description.observation_space);
    println!("Action space: {}", description.action_space);
    println!("\nObservation details:");
    println!("  - x, y coordinates");
    println!("  - x, y velocities");
    println!("  - angle, angular velocity");
    println!("  - left leg contact, right leg contact");

    println!("\nTraining PPO agent...");
    println!("This may take a few minutes...\n");
    let device = args.device.device.resolve()?;
    let mut model = Model::ppo(&lunar_lander_ppo(), &description, &device)?;
    model.learn(&mut env, args.total_steps, seed)?;
    println!("\nTraining complete!");

    println!("\nTesting trained agent for {} episodes...", args.episodes);
    let mut test_env = EnvKind::gym(scenario, None)?;
    let options = scenario.evaluation_options(args.episodes).with_seed(seed);
    let evaluated = evaluate(&mut test_env, &model, scenario, &options, true);
    test_env.close()?;
    env.close()?;
    evaluated?;

    if args.common.no_render {
        return Ok(());
    }
    demonstrate(scenario, &model, args.visual_episodes, seed)
}
