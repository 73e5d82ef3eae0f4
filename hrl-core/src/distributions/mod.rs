pub mod categorical_distribution;

use candle_core::{Result, Tensor};

/// An action distribution conditioned on observations.
///
/// Single observations are rank 1 tensors, batches are rank 2 with the batch on the first
/// dimension. Actions handed back to environments always live on the CPU.
pub trait Distribution {
    /// Samples an action for a single observation and returns it with its log probability.
    fn get_action(&self, observation: &Tensor) -> Result<(Tensor, f32)>;

    /// The mode of the distribution for a single observation, used for deterministic play.
    fn most_probable(&self, observation: &Tensor) -> Result<Tensor>;

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor>;

    fn entropy(&self, states: &Tensor) -> Result<Tensor>;
}
