pub mod agents;
pub mod distributions;
pub mod env;
pub mod envs;
pub mod error;
pub mod evaluation;
pub mod on_policy_algorithm;
pub mod policies;
pub mod report;
pub mod sampler;
pub mod tensors;
pub mod utils;

use anyhow::Result;

/// A learning algorithm. `OnPolicyAlgorithm` is the only implementor, it drives an agent against
/// an environment until its learning schedule runs out.
pub trait Algorithm {
    fn train(&mut self) -> Result<()>;
}
