use anyhow::Result;
use candle_core::Device;
use hrl_core::{env::EnvironmentDescription, policies::actor_critic::ActorCritic};

/// Builds the actor and critic networks. Both use the same hidden layer sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyBuilder {
    pub hidden_layers: Vec<usize>,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 64],
        }
    }
}

impl PolicyBuilder {
    pub fn build_policy(
        &self,
        env_description: &EnvironmentDescription,
        learning_rate: f64,
        max_grad_norm: f32,
        device: &Device,
    ) -> Result<ActorCritic> {
        // a non positive norm turns clipping off
        let max_grad_norm = (max_grad_norm > 0.).then_some(max_grad_norm);
        ActorCritic::build(
            env_description,
            &self.hidden_layers,
            learning_rate,
            max_grad_norm,
            device,
        )
    }
}
