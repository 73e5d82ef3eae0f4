//! Trains A2C on CartPole, evaluates it over a fixed step budget and shows a few episodes.

use anyhow::Result;
use clap::Parser;
use hrl_api::{Model, Scenario, builders::a2c::A2CBuilder};
use hrl_core::{
    env::Env,
    envs::CartPole,
    evaluation::{run_for_steps, summarize},
    report::{Report, ReportSink},
};
use hrl_examples::{
    CommonArgs, ConsoleSink, DeviceArgs, EnvKind, Narration, demonstrate, init_tracing,
};
use hrl_gym::RenderMode;

#[derive(Debug, Parser)]
#[command(about = "Train an A2C agent on CartPole-v1")]
struct Args {
    #[arg(long, default_value_t = 10_000)]
    total_steps: usize,
    /// Step budget of the headless evaluation.
    #[arg(long, default_value_t = 50_000)]
    eval_steps: usize,
    /// Number of rendered episodes.
    #[arg(long, default_value_t = 5)]
    episodes: usize,
    /// Use the built-in cart pole instead of gymnasium. Implies --no-render.
    #[arg(long)]
    native: bool,
    #[command(flatten)]
    device: DeviceArgs,
    #[command(flatten)]
    common: CommonArgs,
}

fn make_env(native: bool, render_mode: Option<RenderMode>) -> Result<EnvKind> {
    if native {
        Ok(EnvKind::CartPole(CartPole::new()))
    } else {
        EnvKind::gym(Scenario::CartPole, render_mode)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let scenario = Scenario::CartPole;
    let seed = args.common.seed;

    println!("Creating environment and training model...");
    let mut env = make_env(args.native, None)?;
    let device = args.device.device.resolve()?;
    let mut model = Model::a2c(&A2CBuilder::default(), &env.env_description(), &device)?;
    model.learn(&mut env, args.total_steps, seed)?;
    println!("\nTraining complete!");

    println!("\nTesting trained agent...");
    let mut test_env = make_env(args.native, Some(RenderMode::RgbArray))?;
    let options = scenario.evaluation_options(1).with_seed(seed);
    let mut sink = ConsoleSink::new(scenario, Narration::Evaluation { show_steps: true });
    let evaluated = run_for_steps(&mut test_env, &model, &options, args.eval_steps, &mut sink);
    test_env.close()?;
    env.close()?;
    let outcomes = evaluated?;
    if outcomes.is_empty() {
        println!("\nCompleted 0 episodes");
    } else {
        let summary = summarize(&outcomes, options.success_threshold)?;
        sink.report(Report::Summary(&summary));
    }

    if args.native || args.common.no_render {
        return Ok(());
    }
    demonstrate(scenario, &model, args.episodes, seed)
}
