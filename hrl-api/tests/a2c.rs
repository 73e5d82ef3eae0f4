use anyhow::Result;
use candle_core::Device;
use hrl_api::{AlgorithmKind, Model, builders::a2c::A2CBuilder};
use hrl_core::{
    env::Env,
    envs::CartPole,
    evaluation::{EvaluationOptions, run_for_steps},
    report::NullSink,
};

#[test]
fn a2c_trains_on_native_cart_pole() -> Result<()> {
    let mut env = CartPole::new();
    let mut model = Model::a2c(&A2CBuilder::default(), &env.env_description(), &Device::Cpu)?;
    assert_eq!(model.algorithm(), AlgorithmKind::A2c);
    model.learn(&mut env, 500, Some(0))?;

    let mut eval_env = CartPole::new().with_max_steps(50);
    let options = EvaluationOptions::new(1).with_seed(Some(1));
    let outcomes = run_for_steps(&mut eval_env, &model, &options, 200, &mut NullSink)?;
    assert!(!outcomes.is_empty());
    assert!(outcomes.iter().map(|o| o.step_count).sum::<usize>() <= 200);
    Ok(())
}
