pub mod hooks;

use crate::{
    HookResult, process_hook_result,
    ppo::hooks::{DefaultPPOHooks, PPOBatchData, PPOHooksTrait},
};
use bincode::{Decode, Encode};
use candle_core::{Device, Result, Tensor};
use hrl_core::{
    agents::Agent,
    distributions::{Distribution, categorical_distribution::CategoricalDistribution},
    policies::{Policy, ValueFunction, actor_critic::ActorCritic},
    tensors::{Advantages, Logp, LogpDiff, PolicyLoss, ValueLoss, ValuesPred},
    utils::{mini_batching::RolloutBatchIterator, rollout_buffer::RolloutBuffer},
};
use std::ops::Deref;

/// PPO hyperparameters. The defaults are the usual ones for small control tasks.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PPOParams {
    pub learning_rate: f64,
    pub n_steps: usize,
    pub batch_size: usize,
    pub n_epochs: usize,
    pub gamma: f32,
    pub gae_lambda: f32,
    pub clip_range: f32,
    pub normalize_advantage: bool,
    pub ent_coef: f32,
    pub vf_coef: f32,
    pub max_grad_norm: f32,
    pub target_kl: Option<f32>,
}

impl Default for PPOParams {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            n_steps: 2048,
            batch_size: 64,
            n_epochs: 10,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_range: 0.2,
            normalize_advantage: true,
            ent_coef: 0.,
            vf_coef: 0.5,
            max_grad_norm: 0.5,
            target_kl: None,
        }
    }
}

/// Standardises a batch of advantages. Single element batches are left alone.
pub fn normalize_advantages(advantages: &Tensor) -> Result<Tensor> {
    let n = advantages.dim(0)?;
    if n < 2 {
        return Ok(advantages.clone());
    }
    let mean = advantages.mean_all()?;
    let centered = advantages.broadcast_sub(&mean)?;
    let std = (centered.sqr()?.sum_all()? / (n - 1) as f64)?.sqrt()?;
    centered.broadcast_div(&(std + 1e-8)?)
}

pub struct PPO {
    policy: ActorCritic,
    hooks: Box<dyn PPOHooksTrait>,
    params: PPOParams,
    device: Device,
}

impl PPO {
    pub fn new(policy: ActorCritic, params: PPOParams) -> Self {
        let hooks = DefaultPPOHooks::new(
            params.ent_coef,
            params.vf_coef,
            params.target_kl,
            params.n_epochs,
        );
        Self::with_hooks(policy, params, Box::new(hooks))
    }

    pub fn with_hooks(
        policy: ActorCritic,
        params: PPOParams,
        hooks: Box<dyn PPOHooksTrait>,
    ) -> Self {
        let device = policy.device().clone();
        Self {
            policy,
            hooks,
            params,
            device,
        }
    }

    pub fn params(&self) -> &PPOParams {
        &self.params
    }

    pub fn policy(&self) -> &ActorCritic {
        &self.policy
    }

    fn batching_loop(&mut self, batch_iter: &mut RolloutBatchIterator) -> Result<HookResult> {
        for batch in batch_iter {
            let batch = batch?;
            let advantages = if self.params.normalize_advantage {
                Advantages(normalize_advantages(&batch.advantages)?)
            } else {
                Advantages(batch.advantages.clone())
            };
            let logp = Logp(
                self.policy
                    .distribution()
                    .log_probs(&batch.observations, &batch.actions)?,
            );
            let values_pred = ValuesPred(self.policy.calculate_values(&batch.observations)?);
            let mut value_loss = ValueLoss(batch.returns.sub(&values_pred)?.sqr()?.mean_all()?);
            let logp_diff = LogpDiff((logp.deref() - &batch.logp_old)?);
            let ratio = logp_diff.exp()?;
            let clip_range = self.params.clip_range as f64;
            let clip_adv = (ratio.clamp(1. - clip_range, 1. + clip_range)? * advantages.deref())?;
            let mut policy_loss = PolicyLoss(
                Tensor::minimum(&(&ratio * advantages.deref())?, &clip_adv)?
                    .neg()?
                    .mean_all()?,
            );
            let ppo_data = PPOBatchData {
                logp,
                values_pred,
                logp_diff,
                ratio,
            };
            let hook_result = self.hooks.batch_hook(
                &mut self.policy,
                &batch,
                &mut policy_loss,
                &mut value_loss,
                &ppo_data,
            )?;
            let loss = (policy_loss.deref() + value_loss.deref())?;
            self.policy.update(&loss)?;
            if let HookResult::Break = hook_result {
                return Ok(HookResult::Break);
            }
        }
        Ok(HookResult::Continue)
    }

    fn learning_loop(
        &mut self,
        rollout: &RolloutBuffer,
        advantages: &[f32],
        returns: &[f32],
    ) -> Result<()> {
        loop {
            let mut batch_iter = RolloutBatchIterator::new(
                rollout,
                advantages,
                returns,
                self.params.batch_size,
                self.device.clone(),
            )
            .shuffled();
            if let HookResult::Break = self.batching_loop(&mut batch_iter)? {
                return Ok(());
            }
            process_hook_result!(self.hooks.rollout_hook(&mut self.policy, rollout));
        }
    }
}

impl Agent for PPO {
    type Dist = CategoricalDistribution;

    fn distribution(&self) -> &Self::Dist {
        self.policy.distribution()
    }

    fn learn(&mut self, rollout: RolloutBuffer) -> Result<()> {
        if rollout.is_empty() {
            return Ok(());
        }
        let (mut advantages, mut returns) = rollout.calculate_advantages_and_returns(
            &self.policy,
            self.params.gamma,
            self.params.gae_lambda,
        )?;
        process_hook_result!(self.hooks.before_learning_hook(
            &mut self.policy,
            &rollout,
            &mut advantages,
            &mut returns,
        ));
        self.learning_loop(&rollout, &advantages, &returns)
    }
}

impl Policy for PPO {
    type Tensor = Tensor;

    fn predict(&self, observation: &Tensor, deterministic: bool) -> anyhow::Result<Tensor> {
        self.policy.predict(observation, deterministic)
    }
}
