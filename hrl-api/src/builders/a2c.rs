use crate::builders::policies::PolicyBuilder;
use anyhow::Result;
use candle_core::Device;
use hrl_agents::a2c::{A2C, A2CParams};
use hrl_core::env::EnvironmentDescription;

#[derive(Debug, Clone, Default)]
pub struct A2CBuilder {
    pub policy_builder: PolicyBuilder,
    pub params: A2CParams,
}

impl A2CBuilder {
    pub fn build(&self, device: &Device, env_description: &EnvironmentDescription) -> Result<A2C> {
        let policy = self.policy_builder.build_policy(
            env_description,
            self.params.learning_rate,
            self.params.max_grad_norm,
            device,
        )?;
        Ok(A2C::new(policy, self.params.clone()))
    }
}
