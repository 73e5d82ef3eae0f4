use super::Distribution;
use crate::utils::sequential::Sequential;
use candle_core::{D, Device, Error, Result, Tensor};
use candle_nn::Module;
use candle_nn::ops::{log_softmax, softmax};
use rand::distr::Distribution as RandDistribution;
use rand::distr::weighted::WeightedIndex;

#[derive(Clone, Debug)]
pub struct CategoricalDistribution {
    action_size: usize,
    logits: Sequential,
    device: Device,
}

impl CategoricalDistribution {
    pub fn new(action_size: usize, logits: Sequential, device: Device) -> Self {
        Self {
            action_size,
            logits,
            device,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_size
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    fn single_logits(&self, observation: &Tensor) -> Result<Tensor> {
        if observation.rank() != 1 {
            return Err(Error::Msg(format!(
                "expected a flattened observation, got shape {:?}",
                observation.dims()
            )));
        }
        let observation = observation.to_device(&self.device)?.unsqueeze(0)?;
        self.logits.forward(&observation)?.squeeze(0)
    }

    fn one_hot(&self, action: usize) -> Result<Tensor> {
        let mut action_mask = vec![0f32; self.action_size];
        action_mask[action] = 1.;
        Tensor::from_vec(action_mask, self.action_size, &Device::Cpu)
    }
}

impl Distribution for CategoricalDistribution {
    fn get_action(&self, observation: &Tensor) -> Result<(Tensor, f32)> {
        let logits = self.single_logits(observation)?;
        let action_probs: Vec<f32> = softmax(&logits, 0)?.to_vec1()?;
        let distribution = WeightedIndex::new(&action_probs).map_err(Error::wrap)?;
        let action = distribution.sample(&mut rand::rng());
        let logp = log_softmax(&logits, 0)?.get(action)?.to_scalar::<f32>()?;
        Ok((self.one_hot(action)?, logp))
    }

    fn most_probable(&self, observation: &Tensor) -> Result<Tensor> {
        let logits = self.single_logits(observation)?;
        let action = logits.argmax(0)?.to_scalar::<u32>()? as usize;
        self.one_hot(action)
    }

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let logits = self.logits.forward(states)?;
        let log_probs = log_softmax(&logits, D::Minus1)?;
        actions.mul(&log_probs)?.sum(D::Minus1)
    }

    fn entropy(&self, states: &Tensor) -> Result<Tensor> {
        let logits = self.logits.forward(states)?;
        let probs = softmax(&logits, D::Minus1)?;
        let log_probs = log_softmax(&logits, D::Minus1)?;
        probs.mul(&log_probs)?.sum(D::Minus1)?.neg()
    }
}
