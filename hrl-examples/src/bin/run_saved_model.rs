//! Loads a trained LunarLander artifact and evaluates it, headless first, then in a window.

use anyhow::{Result, bail};
use clap::Parser;
use hrl_api::{ArtifactError, Model, Scenario};
use hrl_core::env::Env;
use hrl_examples::{
    ARTIFACT_NAME, CommonArgs, DeviceArgs, EnvKind, LOCAL_MODELS_DIR, TRAINING_OUTPUT_DIR, banner,
    copy_instruction, demonstrate, evaluate, init_tracing, local_model_path,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Evaluate a saved LunarLander model")]
struct Args {
    /// Model artifact, defaults to ~/projects/hello_rl/models/lunar_lander_ppo_1M.hrl
    path: Option<PathBuf>,
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

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let scenario = Scenario::LunarLander;
    let path = match args.path {
        Some(path) => path,
        None => local_model_path()?,
    };

    banner(&format!("Loading model from: {}", path.display()));
    let model = match Model::load(&path, args.device.device) {
        Ok(model) => model,
        Err(err @ ArtifactError::Missing { .. }) => {
            eprintln!("\nTo download from the training machine:");
            eprintln!("  mkdir -p ~/{LOCAL_MODELS_DIR}");
            eprintln!(
                "  {}",
                copy_instruction(&format!("~/{TRAINING_OUTPUT_DIR}/{ARTIFACT_NAME}"))
            );
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };
    println!("Model loaded successfully! ({})\n", model.algorithm());

    println!("Testing for {} episodes...", args.episodes);
    let mut test_env = EnvKind::gym(scenario, None)?;
    let description = test_env.env_description();
    if description.observation_size() != model.env_description().observation_size()
        || description.action_space != model.env_description().action_space
    {
        bail!(
            "{} was trained for {} -> {}, {scenario} has {} -> {}",
            path.display(),
            model.env_description().observation_space,
            model.env_description().action_space,
            description.observation_space,
            description.action_space,
        );
    }
    let options = scenario
        .evaluation_options(args.episodes)
        .with_seed(args.common.seed);
    let evaluated = evaluate(&mut test_env, &model, scenario, &options, true);
    test_env.close()?;
    evaluated?;

    if args.common.no_render {
        return Ok(());
    }
    demonstrate(scenario, &model, args.visual_episodes, args.common.seed)
}
