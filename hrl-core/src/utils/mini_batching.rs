use super::rollout_buffer::{RolloutBatch, RolloutBuffer};
use candle_core::{Device, Result, Tensor};
use rand::seq::SliceRandom;

/// Splits a rollout into batches of `sample_size` steps. The last batch may be smaller.
pub struct RolloutBatchIterator<'a> {
    rollout: &'a RolloutBuffer,
    advantages: &'a [f32],
    returns: &'a [f32],
    indicies: Vec<usize>,
    current: usize,
    sample_size: usize,
    device: Device,
}

impl<'a> RolloutBatchIterator<'a> {
    pub fn new(
        rollout: &'a RolloutBuffer,
        advantages: &'a [f32],
        returns: &'a [f32],
        sample_size: usize,
        device: Device,
    ) -> Self {
        Self {
            rollout,
            advantages,
            returns,
            indicies: (0..rollout.len()).collect(),
            current: 0,
            sample_size: sample_size.max(1),
            device,
        }
    }

    pub fn shuffled(mut self) -> Self {
        self.indicies.shuffle(&mut rand::rng());
        self
    }

    fn batch(&self, batch_indicies: &[usize]) -> Result<RolloutBatch> {
        let states: Vec<&Tensor> = batch_indicies
            .iter()
            .map(|i| &self.rollout.states[*i])
            .collect();
        let actions: Vec<&Tensor> = batch_indicies
            .iter()
            .map(|i| &self.rollout.actions[*i])
            .collect();
        let gather = |xs: &[f32]| batch_indicies.iter().map(|i| xs[*i]).collect::<Vec<f32>>();
        let n = batch_indicies.len();
        Ok(RolloutBatch {
            observations: Tensor::stack(&states, 0)?.to_device(&self.device)?,
            actions: Tensor::stack(&actions, 0)?.to_device(&self.device)?,
            returns: Tensor::from_vec(gather(self.returns), n, &self.device)?,
            advantages: Tensor::from_vec(gather(self.advantages), n, &self.device)?,
            logp_old: Tensor::from_vec(gather(&self.rollout.logps), n, &self.device)?,
        })
    }
}

impl Iterator for RolloutBatchIterator<'_> {
    type Item = Result<RolloutBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.indicies.len() {
            return None;
        }
        let end = (self.current + self.sample_size).min(self.indicies.len());
        let batch = self.batch(&self.indicies[self.current..end]);
        self.current = end;
        Some(batch)
    }
}
