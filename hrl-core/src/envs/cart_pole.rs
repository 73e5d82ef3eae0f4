use crate::env::{Env, EnvironmentDescription, SnapShot, Space};
use anyhow::{Result, bail};
use candle_core::{Device, Tensor};
use rand::{Rng, SeedableRng, rngs::StdRng};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
// half the pole's length
const LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * LENGTH;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;
const THETA_THRESHOLD: f32 = 12. * 2. * std::f32::consts::PI / 360.;
const X_THRESHOLD: f32 = 2.4;
const RESET_BOUND: f32 = 0.05;
pub const CART_POLE_MAX_STEPS: usize = 500;

/// The classic cart-pole balancing task with CartPole-v1 dynamics and time limit.
///
/// Observations are `[x, x_dot, theta, theta_dot]`, actions are one-hot over
/// `[push left, push right]`.
#[derive(Debug)]
pub struct CartPole {
    state: Option<[f32; 4]>,
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new()
    }
}

impl CartPole {
    pub fn new() -> Self {
        Self {
            state: None,
            steps: 0,
            max_steps: CART_POLE_MAX_STEPS,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn observation(state: &[f32; 4]) -> Result<Tensor> {
        Ok(Tensor::new(state, &Device::Cpu)?)
    }

    fn push_right(action: &Tensor) -> Result<bool> {
        let action = action.flatten_all()?;
        match action.dim(0)? {
            2 => Ok(action.argmax(0)?.to_scalar::<u32>()? == 1),
            1 => Ok(action.to_vec1::<f32>()?[0] > 0.),
            n => bail!("cart pole expects a one-hot action of size 2, got {n} values"),
        }
    }
}

impl Env for CartPole {
    type Tensor = Tensor;

    fn reset(&mut self, seed: Option<u64>) -> Result<Tensor> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        let state: [f32; 4] =
            std::array::from_fn(|_| self.rng.random_range(-RESET_BOUND..RESET_BOUND));
        self.steps = 0;
        self.state = Some(state);
        Self::observation(&state)
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot<Tensor>> {
        let Some([x, x_dot, theta, theta_dot]) = self.state else {
            bail!("cart pole stepped before reset");
        };
        let force = if Self::push_right(action)? {
            FORCE_MAG
        } else {
            -FORCE_MAG
        };
        let (sin_theta, cos_theta) = theta.sin_cos();
        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin_theta) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (LENGTH * (4.0 / 3.0 - MASS_POLE * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos_theta / TOTAL_MASS;

        let state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        self.steps += 1;
        self.state = Some(state);

        let terminated = state[0].abs() > X_THRESHOLD || state[2].abs() > THETA_THRESHOLD;
        Ok(SnapShot {
            state: Self::observation(&state)?,
            reward: 1.,
            terminated,
            truncated: !terminated && self.steps >= self.max_steps,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(Space::continous_from_dims(vec![4]), Space::Discrete(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right() -> Tensor {
        Tensor::new(&[0f32, 1.], &Device::Cpu).unwrap()
    }

    #[test]
    fn same_seed_same_start() -> Result<()> {
        let mut a = CartPole::new();
        let mut b = CartPole::new();
        let first: Vec<f32> = a.reset(Some(3))?.to_vec1()?;
        assert_eq!(first, b.reset(Some(3))?.to_vec1::<f32>()?);
        assert!(first.iter().all(|v| v.abs() <= RESET_BOUND));
        Ok(())
    }

    #[test]
    fn pushing_one_way_tips_the_pole() -> Result<()> {
        let mut env = CartPole::new();
        env.reset(Some(0))?;
        let mut steps = 0;
        loop {
            let snapshot = env.step(&right())?;
            steps += 1;
            assert_eq!(snapshot.reward, 1.);
            if snapshot.done() {
                assert!(snapshot.terminated && !snapshot.truncated);
                break;
            }
            assert!(steps < CART_POLE_MAX_STEPS);
        }
        assert!(steps < 50);
        Ok(())
    }

    #[test]
    fn episode_is_truncated_at_the_step_limit() -> Result<()> {
        let mut env = CartPole::new().with_max_steps(3);
        env.reset(Some(1))?;
        let left = Tensor::new(&[1f32, 0.], &Device::Cpu)?;
        assert!(!env.step(&left)?.done());
        assert!(!env.step(&right())?.done());
        let last = env.step(&left)?;
        assert!(last.truncated && !last.terminated);
        Ok(())
    }

    #[test]
    fn stepping_before_reset_fails() {
        assert!(CartPole::new().step(&right()).is_err());
    }

    #[test]
    fn malformed_action_is_rejected() -> Result<()> {
        let mut env = CartPole::new();
        env.reset(None)?;
        assert!(env.step(&Tensor::new(&[0f32, 0., 1.], &Device::Cpu)?).is_err());
        Ok(())
    }
}
