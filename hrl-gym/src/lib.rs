use anyhow::{Result, bail};
use candle_core::{Device, Tensor};
use hrl_core::env::{Env, EnvironmentDescription, SnapShot, Space};
use pyo3::{
    PyObject, Python,
    types::{PyAnyMethods, PyDict},
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Opens a window and renders every step.
    Human,
    RgbArray,
}

impl RenderMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::RgbArray => "rgb_array",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gymnasium environment driven through the embedded python interpreter. Only discrete action
/// spaces are supported.
pub struct GymEnv {
    env: PyObject,
    name: String,
    action_space: Space,
    observation_space: Space,
    closed: bool,
}

impl GymEnv {
    pub fn new(name: &str, render_mode: Option<RenderMode>) -> Result<GymEnv> {
        let env = Python::with_gil(|py| {
            let gym = py.import("gymnasium")?;
            let kwargs = PyDict::new(py);
            if let Some(render_mode) = render_mode {
                kwargs.set_item("render_mode", render_mode.as_str())?;
            }
            let make = gym.getattr("make")?;
            let env = make.call((name,), Some(&kwargs))?;
            let action_space = env.getattr("action_space")?;
            let gym_spaces = py.import("gymnasium.spaces")?;
            let action_space = if action_space.is_instance(&gym_spaces.getattr("Discrete")?)? {
                Space::Discrete(action_space.getattr("n")?.extract()?)
            } else {
                let shape: Vec<usize> = action_space.getattr("shape")?.extract()?;
                Space::continous_from_dims(shape)
            };
            let observation_space = env.getattr("observation_space")?;
            let observation_space: Vec<usize> = observation_space.getattr("shape")?.extract()?;
            let observation_space = Space::continous_from_dims(observation_space);
            anyhow::Ok(GymEnv {
                env: env.into(),
                name: name.to_owned(),
                action_space,
                observation_space,
                closed: false,
            })
        })?;
        if !matches!(env.action_space, Space::Discrete(_)) {
            bail!(
                "{name} has action space {}, only discrete actions are supported",
                env.action_space
            );
        }
        tracing::debug!(
            env = name,
            render_mode = render_mode.map(|mode| mode.as_str()),
            observation_space = %env.observation_space,
            action_space = %env.action_space,
            "gym environment created"
        );
        Ok(env)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            bail!("{} was already closed", self.name);
        }
        Ok(())
    }
}

impl Env for GymEnv {
    type Tensor = Tensor;

    fn reset(&mut self, seed: Option<u64>) -> Result<Tensor> {
        self.ensure_open()?;
        let state: Vec<f32> = Python::with_gil(|py| {
            let kwargs = PyDict::new(py);
            if let Some(seed) = seed {
                kwargs.set_item("seed", seed)?;
            }
            let state = self.env.call_method(py, "reset", (), Some(&kwargs))?;
            state.bind(py).get_item(0)?.extract()
        })?;
        Ok(Tensor::new(state, &Device::Cpu)?)
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot<Tensor>> {
        self.ensure_open()?;
        let action: Vec<f32> = action.flatten_all()?.to_vec1()?;
        let Some(action) = action.iter().position(|a| *a > 0.) else {
            bail!("expected a one-hot action, got {action:?}");
        };
        let (state, reward, terminated, truncated) = Python::with_gil(|py| {
            let step = self.env.call_method(py, "step", (action,), None)?;
            let step = step.bind(py);
            let state: Vec<f32> = step.get_item(0)?.extract()?;
            let reward: f32 = step.get_item(1)?.extract()?;
            let terminated: bool = step.get_item(2)?.extract()?;
            let truncated: bool = step.get_item(3)?.extract()?;
            pyo3::PyResult::Ok((state, reward, terminated, truncated))
        })?;
        Ok(SnapShot {
            state: Tensor::new(state, &Device::Cpu)?,
            reward,
            terminated,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(self.observation_space.clone(), self.action_space.clone())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        Python::with_gil(|py| self.env.call_method0(py, "close"))?;
        Ok(())
    }
}

impl Drop for GymEnv {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(env = %self.name, %err, "failed to close gym environment");
        }
    }
}

// These need a python interpreter with gymnasium[box2d] installed.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore]
    fn cart_pole_spaces() -> Result<()> {
        let env = GymEnv::new("CartPole-v1", None)?;
        let description = env.env_description();
        assert_eq!(description.observation_space.size(), 4);
        assert_eq!(description.action_space, Space::Discrete(2));
        Ok(())
    }

    #[test]
    #[ignore]
    fn seeded_resets_repeat() -> Result<()> {
        let mut env = GymEnv::new("LunarLander-v3", None)?;
        let first: Vec<f32> = env.reset(Some(7))?.to_vec1()?;
        let second: Vec<f32> = env.reset(Some(7))?.to_vec1()?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    #[ignore]
    fn close_is_idempotent() -> Result<()> {
        let mut env = GymEnv::new("CartPole-v1", Some(RenderMode::RgbArray))?;
        env.reset(None)?;
        let action = Tensor::new(&[1f32, 0.], &Device::Cpu)?;
        let snapshot = env.step(&action)?;
        assert_eq!(snapshot.reward, 1.);
        env.close()?;
        env.close()?;
        assert!(env.reset(None).is_err());
        Ok(())
    }

    #[test]
    #[ignore]
    fn continuous_actions_are_rejected() {
        assert!(GymEnv::new("Pendulum-v1", None).is_err());
    }
}
