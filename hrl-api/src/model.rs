use crate::{
    artifact::{
        AlgorithmKind, Architecture, Artifact, ArtifactError, ArtifactHeader, Hyperparameters,
        load_weights, read_artifact, serialize_weights, write_artifact,
    },
    builders::{a2c::A2CBuilder, policies::PolicyBuilder, ppo::PPOBuilder},
    device::DevicePreference,
};
use anyhow::{Result, ensure};
use candle_core::{Device, Tensor};
use hrl_agents::{a2c::A2C, ppo::PPO};
use hrl_core::{
    Algorithm,
    env::{Env, EnvironmentDescription, Space},
    on_policy_algorithm::{DefaultOnPolicyAlgorithmHooks, LearningSchedule, OnPolicyAlgorithm},
    policies::{Policy, actor_critic::ActorCritic},
    sampler::StepBoundSampler,
};
use std::path::Path;

pub enum AgentKind {
    Ppo(PPO),
    A2c(A2C),
}

/// A trainable agent together with what is needed to persist and rebuild it.
pub struct Model {
    agent: AgentKind,
    hidden_layers: Vec<usize>,
    env_description: EnvironmentDescription,
}

impl Model {
    pub fn ppo(
        builder: &PPOBuilder,
        env_description: &EnvironmentDescription,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            agent: AgentKind::Ppo(builder.build(device, env_description)?),
            hidden_layers: builder.policy_builder.hidden_layers.clone(),
            env_description: env_description.clone(),
        })
    }

    pub fn a2c(
        builder: &A2CBuilder,
        env_description: &EnvironmentDescription,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            agent: AgentKind::A2c(builder.build(device, env_description)?),
            hidden_layers: builder.policy_builder.hidden_layers.clone(),
            env_description: env_description.clone(),
        })
    }

    pub fn algorithm(&self) -> AlgorithmKind {
        match &self.agent {
            AgentKind::Ppo(_) => AlgorithmKind::Ppo,
            AgentKind::A2c(_) => AlgorithmKind::A2c,
        }
    }

    pub fn env_description(&self) -> &EnvironmentDescription {
        &self.env_description
    }

    fn policy(&self) -> &ActorCritic {
        match &self.agent {
            AgentKind::Ppo(ppo) => ppo.policy(),
            AgentKind::A2c(a2c) => a2c.policy(),
        }
    }

    pub fn device(&self) -> &Device {
        self.policy().device()
    }

    fn hyperparameters(&self) -> Hyperparameters {
        match &self.agent {
            AgentKind::Ppo(ppo) => Hyperparameters::Ppo(ppo.params().clone()),
            AgentKind::A2c(a2c) => Hyperparameters::A2c(a2c.params().clone()),
        }
    }

    /// Trains for at least `total_steps` environment steps, rounded up to whole rollouts.
    /// `seed` seeds the first reset of `env`.
    pub fn learn<E: Env<Tensor = Tensor>>(
        &mut self,
        env: &mut E,
        total_steps: usize,
        seed: Option<u64>,
    ) -> Result<()> {
        let env_description = env.env_description();
        ensure!(
            env_description.observation_size() == self.env_description.observation_size()
                && env_description.action_space == self.env_description.action_space,
            "environment ({} -> {}) does not match the model ({} -> {})",
            env_description.observation_space,
            env_description.action_space,
            self.env_description.observation_space,
            self.env_description.action_space,
        );
        let hooks = DefaultOnPolicyAlgorithmHooks::new(LearningSchedule::total_step_bound(
            total_steps,
        ));
        tracing::info!(algorithm = %self.algorithm(), total_steps, "training started");
        match &mut self.agent {
            AgentKind::Ppo(ppo) => {
                let sampler = StepBoundSampler::new(env, ppo.params().n_steps, seed);
                OnPolicyAlgorithm {
                    sampler,
                    agent: ppo,
                    hooks,
                }
                .train()
            }
            AgentKind::A2c(a2c) => {
                let sampler = StepBoundSampler::new(env, a2c.params().n_steps, seed);
                OnPolicyAlgorithm {
                    sampler,
                    agent: a2c,
                    hooks,
                }
                .train()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let header = ArtifactHeader {
            architecture: Architecture::MlpPolicy {
                hidden_layers: self.hidden_layers.clone(),
            },
            observation_size: self.env_description.observation_size(),
            action_size: self.env_description.action_size(),
            hyperparameters: self.hyperparameters(),
        };
        let weights = serialize_weights(self.policy().varmap())?;
        write_artifact(path, &Artifact { header, weights })?;
        tracing::info!(path = %path.display(), algorithm = %self.algorithm(), "model saved");
        Ok(())
    }

    /// Rebuilds a saved model on the device `device` resolves to. The result can predict and
    /// keep learning, optimizer state starts fresh.
    pub fn load(path: impl AsRef<Path>, device: DevicePreference) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let Artifact { header, weights } = read_artifact(path)?;
        let device = device.resolve()?;
        let Architecture::MlpPolicy { hidden_layers } = header.architecture;
        let env_description = EnvironmentDescription::new(
            Space::continous_from_dims(vec![header.observation_size]),
            Space::Discrete(header.action_size),
        );
        let policy_builder = PolicyBuilder { hidden_layers };
        let model = match header.hyperparameters {
            Hyperparameters::Ppo(params) => Self::ppo(
                &PPOBuilder {
                    policy_builder,
                    params,
                },
                &env_description,
                &device,
            ),
            Hyperparameters::A2c(params) => Self::a2c(
                &A2CBuilder {
                    policy_builder,
                    params,
                },
                &env_description,
                &device,
            ),
        }
        .map_err(ArtifactError::Network)?;
        load_weights(model.policy().varmap(), &weights, &device)?;
        tracing::info!(
            path = %path.display(),
            algorithm = %model.algorithm(),
            device = ?device,
            "model loaded"
        );
        Ok(model)
    }
}

impl Policy for Model {
    type Tensor = Tensor;

    fn predict(&self, observation: &Tensor, deterministic: bool) -> Result<Tensor> {
        self.policy().predict(observation, deterministic)
    }
}
