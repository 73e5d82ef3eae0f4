use crate::policies::ValueFunction;
use candle_core::{Result, Tensor};

/// Transitions of one environment, in order. `states` holds one more entry than the other
/// vectors: the state reached after the last step, used to bootstrap the value estimate.
#[derive(Debug, Default)]
pub struct RolloutBuffer {
    pub states: Vec<Tensor>,
    pub actions: Vec<Tensor>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub logps: Vec<f32>,
}

impl RolloutBuffer {
    pub fn push_step(&mut self, state: Tensor, action: Tensor, reward: f32, done: bool, logp: f32) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
        self.dones.push(done);
        self.logps.push(logp);
    }

    pub fn push_state(&mut self, state: Tensor) {
        self.states.push(state);
    }

    /// Number of steps stored
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Generalised advantage estimation. Returns `(advantages, returns)`, one entry per step.
    pub fn calculate_advantages_and_returns<V: ValueFunction + ?Sized>(
        &self,
        value_function: &V,
        gamma: f32,
        lambda: f32,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        let total_steps = self.len();
        if total_steps == 0 {
            return Ok((vec![], vec![]));
        }
        let states = Tensor::stack(&self.states, 0)?;
        let values: Vec<f32> = value_function.calculate_values(&states)?.to_vec1()?;
        let mut advantages: Vec<f32> = vec![0.; total_steps];
        let mut returns: Vec<f32> = vec![0.; total_steps];
        let mut last_gae_lam: f32 = 0.;
        for i in (0..total_steps).rev() {
            let next_non_terminal = if self.dones[i] { 0f32 } else { 1. };
            let delta = self.rewards[i] + next_non_terminal * gamma * values[i + 1] - values[i];
            last_gae_lam = delta + next_non_terminal * gamma * lambda * last_gae_lam;
            advantages[i] = last_gae_lam;
            returns[i] = last_gae_lam + values[i];
        }
        Ok((advantages, returns))
    }
}

pub struct RolloutBatch {
    pub observations: Tensor,
    pub actions: Tensor,
    pub returns: Tensor,
    pub advantages: Tensor,
    pub logp_old: Tensor,
}
