use crate::{distributions::Distribution, utils::rollout_buffer::RolloutBuffer};
use candle_core::Result;

pub trait Agent {
    type Dist: Distribution;

    /// The action distribution rollouts are sampled from
    fn distribution(&self) -> &Self::Dist;

    /// Updates the agent's networks from one collected rollout
    fn learn(&mut self, rollout: RolloutBuffer) -> Result<()>;
}

impl<A: Agent + ?Sized> Agent for &mut A {
    type Dist = A::Dist;

    fn distribution(&self) -> &Self::Dist {
        (**self).distribution()
    }

    fn learn(&mut self, rollout: RolloutBuffer) -> Result<()> {
        (**self).learn(rollout)
    }
}
