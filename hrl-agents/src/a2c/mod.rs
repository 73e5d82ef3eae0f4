use crate::ppo::normalize_advantages;
use bincode::{Decode, Encode};
use candle_core::{Device, Result, Tensor};
use hrl_core::{
    agents::Agent,
    distributions::{Distribution, categorical_distribution::CategoricalDistribution},
    policies::{Policy, ValueFunction, actor_critic::ActorCritic},
    tensors::{EntropyLoss, PolicyLoss, ValueLoss},
    utils::{mini_batching::RolloutBatchIterator, rollout_buffer::RolloutBuffer},
};
use std::ops::Deref;

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct A2CParams {
    pub learning_rate: f64,
    pub n_steps: usize,
    pub gamma: f32,
    pub gae_lambda: f32,
    pub ent_coef: f32,
    pub vf_coef: f32,
    pub max_grad_norm: f32,
    pub normalize_advantage: bool,
}

impl Default for A2CParams {
    fn default() -> Self {
        Self {
            learning_rate: 7e-4,
            n_steps: 5,
            gamma: 0.99,
            gae_lambda: 1.,
            ent_coef: 0.,
            vf_coef: 0.5,
            max_grad_norm: 0.5,
            normalize_advantage: false,
        }
    }
}

/// Synchronous advantage actor critic. Every rollout is consumed by a single gradient step.
pub struct A2C {
    policy: ActorCritic,
    params: A2CParams,
    device: Device,
}

impl A2C {
    pub fn new(policy: ActorCritic, params: A2CParams) -> Self {
        let device = policy.device().clone();
        Self {
            policy,
            params,
            device,
        }
    }

    pub fn params(&self) -> &A2CParams {
        &self.params
    }

    pub fn policy(&self) -> &ActorCritic {
        &self.policy
    }
}

impl Agent for A2C {
    type Dist = CategoricalDistribution;

    fn distribution(&self) -> &Self::Dist {
        self.policy.distribution()
    }

    fn learn(&mut self, rollout: RolloutBuffer) -> Result<()> {
        if rollout.is_empty() {
            return Ok(());
        }
        let (advantages, returns) = rollout.calculate_advantages_and_returns(
            &self.policy,
            self.params.gamma,
            self.params.gae_lambda,
        )?;
        let batch_iter = RolloutBatchIterator::new(
            &rollout,
            &advantages,
            &returns,
            rollout.len(),
            self.device.clone(),
        );
        for batch in batch_iter {
            let batch = batch?;
            let advantages = if self.params.normalize_advantage {
                normalize_advantages(&batch.advantages)?
            } else {
                batch.advantages
            };
            let distribution = self.policy.distribution();
            let logps = distribution.log_probs(&batch.observations, &batch.actions)?;
            let values_pred = self.policy.calculate_values(&batch.observations)?;
            let value_loss = ValueLoss(batch.returns.sub(&values_pred)?.sqr()?.mean_all()?);
            let policy_loss = PolicyLoss(advantages.mul(&logps)?.neg()?.mean_all()?);
            let entropy_loss = EntropyLoss(
                distribution
                    .entropy(&batch.observations)?
                    .mean_all()?
                    .neg()?,
            );
            let loss = (policy_loss.deref()
                + value_loss.affine(self.params.vf_coef as f64, 0.)?
                + entropy_loss.affine(self.params.ent_coef as f64, 0.)?)?;
            tracing::trace!(
                policy_loss = policy_loss.to_scalar::<f32>()?,
                value_loss = value_loss.to_scalar::<f32>()?,
                "a2c update"
            );
            self.policy.update(&loss)?;
        }
        Ok(())
    }
}

impl Policy for A2C {
    type Tensor = Tensor;

    fn predict(&self, observation: &Tensor, deterministic: bool) -> anyhow::Result<Tensor> {
        self.policy.predict(observation, deterministic)
    }
}
