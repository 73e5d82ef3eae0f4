use crate::HookResult;
use candle_core::{Result, Tensor};
use hrl_core::{
    distributions::Distribution,
    policies::actor_critic::ActorCritic,
    tensors::{Logp, LogpDiff, PolicyLoss, ValueLoss, ValuesPred},
    utils::rollout_buffer::{RolloutBatch, RolloutBuffer},
};

pub struct PPOBatchData {
    pub logp: Logp,
    pub values_pred: ValuesPred,
    pub logp_diff: LogpDiff,
    pub ratio: Tensor,
}

pub trait PPOHooksTrait {
    fn before_learning_hook(
        &mut self,
        _policy: &mut ActorCritic,
        _rollout: &RolloutBuffer,
        _advantages: &mut Vec<f32>,
        _returns: &mut Vec<f32>,
    ) -> Result<HookResult> {
        Ok(HookResult::Continue)
    }

    /// Called after every pass over the rollout. Breaking ends the update.
    fn rollout_hook(&mut self, policy: &mut ActorCritic, rollout: &RolloutBuffer)
    -> Result<HookResult>;

    /// May rewrite the losses before the optimizer step. Breaking skips the remaining batches of
    /// the update, the current batch is still applied.
    fn batch_hook(
        &mut self,
        policy: &mut ActorCritic,
        rollout_batch: &RolloutBatch,
        policy_loss: &mut PolicyLoss,
        value_loss: &mut ValueLoss,
        data: &PPOBatchData,
    ) -> Result<HookResult>;
}

/// Entropy bonus, value loss weighting, a fixed number of epochs and optional early stopping on
/// the approximate KL divergence.
#[derive(Debug, Clone)]
pub struct DefaultPPOHooks {
    ent_coef: f32,
    vf_coef: f32,
    target_kl: Option<f32>,
    total_epochs: usize,
    current_epoch: usize,
}

impl DefaultPPOHooks {
    pub fn new(ent_coef: f32, vf_coef: f32, target_kl: Option<f32>, total_epochs: usize) -> Self {
        Self {
            ent_coef,
            vf_coef,
            target_kl,
            total_epochs: total_epochs.max(1),
            current_epoch: 1,
        }
    }
}

impl PPOHooksTrait for DefaultPPOHooks {
    fn rollout_hook(
        &mut self,
        _policy: &mut ActorCritic,
        _rollout: &RolloutBuffer,
    ) -> Result<HookResult> {
        if self.current_epoch >= self.total_epochs {
            self.current_epoch = 1;
            Ok(HookResult::Break)
        } else {
            self.current_epoch += 1;
            Ok(HookResult::Continue)
        }
    }

    fn batch_hook(
        &mut self,
        policy: &mut ActorCritic,
        rollout_batch: &RolloutBatch,
        policy_loss: &mut PolicyLoss,
        value_loss: &mut ValueLoss,
        data: &PPOBatchData,
    ) -> Result<HookResult> {
        if self.ent_coef != 0. {
            let entropy = policy
                .distribution()
                .entropy(&rollout_batch.observations)?
                .mean_all()?;
            let entropy_loss = entropy.affine(-self.ent_coef as f64, 0.)?;
            *policy_loss = PolicyLoss(policy_loss.add(&entropy_loss)?);
        }
        *value_loss = ValueLoss(value_loss.affine(self.vf_coef as f64, 0.)?);
        let approx_kl = -(data.logp_diff.mean_all()?.to_scalar::<f32>()?);
        tracing::trace!(
            epoch = self.current_epoch,
            policy_loss = policy_loss.to_scalar::<f32>()?,
            value_loss = value_loss.to_scalar::<f32>()?,
            approx_kl,
            "ppo batch"
        );
        match self.target_kl {
            Some(target_kl) if approx_kl > 1.5 * target_kl => {
                tracing::debug!(epoch = self.current_epoch, approx_kl, "early stopping");
                self.current_epoch = 1;
                Ok(HookResult::Break)
            }
            _ => Ok(HookResult::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrl_core::env::{EnvironmentDescription, Space};

    #[test]
    fn epochs_wrap_around_after_the_last_one() -> anyhow::Result<()> {
        let description =
            EnvironmentDescription::new(Space::continous_from_dims(vec![4]), Space::Discrete(2));
        let mut policy =
            ActorCritic::build(&description, &[8], 3e-4, None, &candle_core::Device::Cpu)?;
        let rollout = RolloutBuffer::default();
        let mut hooks = DefaultPPOHooks::new(0., 0.5, None, 3);
        let mut breaks = vec![];
        for _ in 0..6 {
            let res = hooks.rollout_hook(&mut policy, &rollout)?;
            breaks.push(matches!(res, HookResult::Break));
        }
        assert_eq!(breaks, vec![false, false, true, false, false, true]);
        Ok(())
    }
}
