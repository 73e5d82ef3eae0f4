use crate::error::CoreError;
use anyhow::Result;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    Discrete(usize),
    Continous { size: usize },
}

impl Space {
    pub fn continous_from_dims(dims: Vec<usize>) -> Self {
        Self::Continous {
            size: dims.iter().product(),
        }
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continous { size } => *size,
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discrete(n) => write!(f, "Discrete({n})"),
            Self::Continous { size } => write!(f, "Box({size})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }

    /// Number of discrete actions. Agents in this workspace only act in discrete spaces.
    pub fn discrete_actions(&self) -> std::result::Result<usize, CoreError> {
        match &self.action_space {
            Space::Discrete(n) => Ok(*n),
            other => Err(CoreError::UnsupportedActionSpace(other.to_string())),
        }
    }
}

/// The result of a single environment step.
#[derive(Debug, Clone)]
pub struct SnapShot<T> {
    pub state: T,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
}

impl<T> SnapShot<T> {
    /// Termination is the natural end of an episode, truncation an externally imposed cutoff.
    /// Either one ends the episode.
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Env {
    type Tensor: Clone;

    /// Starts a new episode. `None` leaves seeding to the environment.
    fn reset(&mut self, seed: Option<u64>) -> Result<Self::Tensor>;
    fn step(&mut self, action: &Self::Tensor) -> Result<SnapShot<Self::Tensor>>;
    fn env_description(&self) -> EnvironmentDescription;

    /// Releases the environment. Calling it more than once is allowed.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<E: Env + ?Sized> Env for &mut E {
    type Tensor = E::Tensor;

    fn reset(&mut self, seed: Option<u64>) -> Result<Self::Tensor> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: &Self::Tensor) -> Result<SnapShot<Self::Tensor>> {
        (**self).step(action)
    }

    fn env_description(&self) -> EnvironmentDescription {
        (**self).env_description()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_space_size_is_product_of_dims() {
        assert_eq!(Space::continous_from_dims(vec![2, 4]).size(), 8);
    }

    #[test]
    fn continous_action_space_is_rejected() {
        let description = EnvironmentDescription::new(
            Space::continous_from_dims(vec![3]),
            Space::continous_from_dims(vec![1]),
        );
        assert_eq!(
            description.discrete_actions(),
            Err(CoreError::UnsupportedActionSpace("Box(1)".into()))
        );
    }

    #[test]
    fn discrete_action_space_reports_action_count() {
        let description =
            EnvironmentDescription::new(Space::continous_from_dims(vec![8]), Space::Discrete(4));
        assert_eq!(description.discrete_actions(), Ok(4));
        assert_eq!(description.observation_size(), 8);
    }
}
