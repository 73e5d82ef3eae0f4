use anyhow::Result;
use candle_core::{Device, Tensor};
use hrl_api::{
    ArtifactError, DevicePreference, Model,
    builders::{a2c::A2CBuilder, ppo::PPOBuilder},
};
use hrl_core::{
    env::{EnvironmentDescription, Space},
    envs::CartPole,
    policies::Policy,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn lander_description() -> EnvironmentDescription {
    EnvironmentDescription::new(Space::continous_from_dims(vec![8]), Space::Discrete(4))
}

fn observations(count: usize, size: usize) -> Result<Vec<Tensor>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let values: Vec<f32> = (0..size).map(|_| rng.random_range(-2f32..2.)).collect();
            Ok(Tensor::from_vec(values, size, &Device::Cpu)?)
        })
        .collect()
}

fn actions(model: &Model, observations: &[Tensor]) -> Result<Vec<Vec<f32>>> {
    observations
        .iter()
        .map(|obs| Ok(model.predict(obs, true)?.to_vec1()?))
        .collect()
}

#[test]
fn saved_ppo_predicts_the_same_actions() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lunar_lander_ppo.hrl");
    let model = Model::ppo(&PPOBuilder::default(), &lander_description(), &Device::Cpu)?;
    model.save(&path)?;

    let loaded = Model::load(&path, DevicePreference::Cpu)?;
    assert_eq!(loaded.algorithm(), model.algorithm());
    assert_eq!(loaded.env_description(), model.env_description());
    let observations = observations(100, 8)?;
    assert_eq!(actions(&model, &observations)?, actions(&loaded, &observations)?);
    Ok(())
}

#[test]
fn loaded_a2c_keeps_learning() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cart_pole_a2c.hrl");
    let mut env = CartPole::new();
    let description = hrl_core::env::Env::env_description(&env);
    let mut builder = A2CBuilder::default();
    builder.policy_builder.hidden_layers = vec![16];
    builder.params.ent_coef = 0.01;
    let mut model = Model::a2c(&builder, &description, &Device::Cpu)?;
    model.learn(&mut env, 50, Some(3))?;
    model.save(&path)?;

    let mut loaded = Model::load(&path, DevicePreference::AcceleratorPreferred)?;
    let observations = observations(20, 4)?;
    assert_eq!(actions(&model, &observations)?, actions(&loaded, &observations)?);
    loaded.learn(&mut env, 50, None)?;
    Ok(())
}

#[test]
fn missing_artifact_names_the_path() {
    let path = std::env::temp_dir()
        .join("hrl-missing-dir")
        .join("lunar_lander_ppo_1M.hrl");
    let Err(err) = Model::load(&path, DevicePreference::Cpu) else {
        panic!("loading a missing artifact succeeded");
    };
    assert!(matches!(err, ArtifactError::Missing { .. }));
    assert!(err.to_string().contains("lunar_lander_ppo_1M.hrl"));
}

#[test]
fn overwriting_an_artifact_replaces_it() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("model.hrl");
    Model::ppo(&PPOBuilder::default(), &lander_description(), &Device::Cpu)?.save(&path)?;
    let cart_pole =
        EnvironmentDescription::new(Space::continous_from_dims(vec![4]), Space::Discrete(2));
    Model::a2c(&A2CBuilder::default(), &cart_pole, &Device::Cpu)?.save(&path)?;
    let loaded = Model::load(&path, DevicePreference::Cpu)?;
    assert_eq!(loaded.env_description(), &cart_pole);
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}
