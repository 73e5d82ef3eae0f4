pub mod actor_critic;

use crate::utils::clip_grad::clip_grad;
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::{AdamW, Optimizer, VarMap};
use std::fmt::Debug;

/// Maps observations to actions.
pub trait Policy {
    type Tensor;

    /// Chooses an action for `observation`. With `deterministic` set the most probable action is
    /// returned, otherwise one is sampled.
    fn predict(&self, observation: &Self::Tensor, deterministic: bool) -> Result<Self::Tensor>;
}

impl<P: Policy + ?Sized> Policy for &P {
    type Tensor = P::Tensor;

    fn predict(&self, observation: &Self::Tensor, deterministic: bool) -> Result<Self::Tensor> {
        (**self).predict(observation, deterministic)
    }
}

pub trait ValueFunction {
    fn calculate_values(&self, observation: &Tensor) -> candle_core::Result<Tensor>;
}

pub struct OptimizerWithMaxGrad {
    pub optimizer: AdamW,
    pub max_grad_norm: Option<f32>,
    pub varmap: VarMap,
}

impl Debug for OptimizerWithMaxGrad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerWithMaxGrad")
            .field("learning_rate", &self.optimizer.learning_rate())
            .field("max_grad_norm", &self.max_grad_norm)
            .finish()
    }
}

impl OptimizerWithMaxGrad {
    pub fn new(optimizer: AdamW, max_grad_norm: Option<f32>, varmap: VarMap) -> Self {
        Self {
            optimizer,
            max_grad_norm,
            varmap,
        }
    }

    pub fn backward_step(&mut self, loss: &Tensor) -> candle_core::Result<()> {
        let grads = if let Some(max_norm) = self.max_grad_norm {
            clip_grad(loss, &self.varmap, max_norm)?
        } else {
            loss.backward()?
        };
        self.optimizer.step(&grads)
    }
}
