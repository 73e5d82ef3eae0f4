use super::{OptimizerWithMaxGrad, Policy, ValueFunction};
use crate::{
    distributions::{Distribution, categorical_distribution::CategoricalDistribution},
    env::EnvironmentDescription,
    utils::sequential::{Sequential, build_sequential},
};
use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{AdamW, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};

/// Separate policy and value networks sharing a single optimizer. Every parameter lives in one
/// `VarMap`, which is also what gets persisted.
#[derive(Debug)]
pub struct ActorCritic {
    distribution: CategoricalDistribution,
    value_net: Sequential,
    optimizer_with_grad: OptimizerWithMaxGrad,
}

impl ActorCritic {
    /// Freshly initialised networks for a discrete-action environment.
    pub fn build(
        env_description: &EnvironmentDescription,
        hidden_layers: &[usize],
        learning_rate: f64,
        max_grad_norm: Option<f32>,
        device: &Device,
    ) -> anyhow::Result<Self> {
        let action_size = env_description.discrete_actions()?;
        let observation_size = env_description.observation_size();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let policy_layers = [hidden_layers, &[action_size]].concat();
        let logits = build_sequential(observation_size, &policy_layers, &vb, "policy")?;
        let value_layers = [hidden_layers, &[1]].concat();
        let value_net = build_sequential(observation_size, &value_layers, &vb, "value")?;
        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: learning_rate,
                weight_decay: 0.,
                ..Default::default()
            },
        )?;
        Ok(Self {
            distribution: CategoricalDistribution::new(action_size, logits, device.clone()),
            value_net,
            optimizer_with_grad: OptimizerWithMaxGrad::new(optimizer, max_grad_norm, varmap),
        })
    }

    pub fn distribution(&self) -> &CategoricalDistribution {
        &self.distribution
    }

    pub fn varmap(&self) -> &VarMap {
        &self.optimizer_with_grad.varmap
    }

    pub fn device(&self) -> &Device {
        self.distribution.device()
    }

    pub fn learning_rate(&self) -> f64 {
        self.optimizer_with_grad.optimizer.learning_rate()
    }

    pub fn update(&mut self, loss: &Tensor) -> Result<()> {
        self.optimizer_with_grad.backward_step(loss)
    }
}

impl ValueFunction for ActorCritic {
    fn calculate_values(&self, observation: &Tensor) -> Result<Tensor> {
        let observation = observation.to_device(self.device())?;
        self.value_net.forward(&observation)?.squeeze(1)
    }
}

impl Policy for ActorCritic {
    type Tensor = Tensor;

    fn predict(&self, observation: &Tensor, deterministic: bool) -> anyhow::Result<Tensor> {
        let action = if deterministic {
            self.distribution.most_probable(observation)?
        } else {
            self.distribution.get_action(observation)?.0
        };
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Space;

    fn description() -> EnvironmentDescription {
        EnvironmentDescription::new(Space::continous_from_dims(vec![4]), Space::Discrete(2))
    }

    #[test]
    fn build_registers_policy_and_value_parameters() -> anyhow::Result<()> {
        let ac = ActorCritic::build(&description(), &[8, 8], 3e-4, Some(0.5), &Device::Cpu)?;
        assert_eq!(ac.varmap().all_vars().len(), 12);
        assert!((ac.learning_rate() - 3e-4).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn values_have_one_entry_per_state() -> anyhow::Result<()> {
        let ac = ActorCritic::build(&description(), &[8], 3e-4, None, &Device::Cpu)?;
        let states = Tensor::zeros((5, 4), DType::F32, &Device::Cpu)?;
        assert_eq!(ac.calculate_values(&states)?.dims(), &[5]);
        Ok(())
    }

    #[test]
    fn continous_actions_are_rejected() {
        let description = EnvironmentDescription::new(
            Space::continous_from_dims(vec![3]),
            Space::continous_from_dims(vec![1]),
        );
        assert!(ActorCritic::build(&description, &[8], 3e-4, None, &Device::Cpu).is_err());
    }

    #[test]
    fn deterministic_prediction_is_one_hot() -> anyhow::Result<()> {
        let ac = ActorCritic::build(&description(), &[8], 3e-4, None, &Device::Cpu)?;
        let observation = Tensor::new(&[0.01f32, 0.02, -0.03, 0.04], &Device::Cpu)?;
        let action: Vec<f32> = ac.predict(&observation, true)?.to_vec1()?;
        assert_eq!(action.iter().filter(|a| **a == 1.).count(), 1);
        Ok(())
    }
}
