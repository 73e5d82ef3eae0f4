use crate::builders::policies::PolicyBuilder;
use anyhow::Result;
use candle_core::Device;
use hrl_agents::ppo::{PPO, PPOParams};
use hrl_core::env::EnvironmentDescription;

#[derive(Debug, Clone, Default)]
pub struct PPOBuilder {
    pub policy_builder: PolicyBuilder,
    pub params: PPOParams,
}

impl PPOBuilder {
    pub fn build(&self, device: &Device, env_description: &EnvironmentDescription) -> Result<PPO> {
        let policy = self.policy_builder.build_policy(
            env_description,
            self.params.learning_rate,
            self.params.max_grad_norm,
            device,
        )?;
        Ok(PPO::new(policy, self.params.clone()))
    }
}
