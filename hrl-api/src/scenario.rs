use hrl_core::evaluation::EvaluationOptions;
use std::fmt;

/// The control tasks the programs know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    CartPole,
    LunarLander,
}

impl Scenario {
    pub fn gym_id(&self) -> &'static str {
        match self {
            Self::CartPole => "CartPole-v1",
            Self::LunarLander => "LunarLander-v3",
        }
    }

    /// Cumulative reward at which an episode counts as solved. CartPole has none.
    pub fn success_threshold(&self) -> Option<f32> {
        match self {
            Self::CartPole => None,
            Self::LunarLander => Some(200.),
        }
    }

    /// Label printed next to an evaluated episode. Rendered demonstrations use a different
    /// vocabulary from headless evaluation.
    pub fn outcome_label(&self, success: bool, rendered: bool) -> Option<&'static str> {
        match (self, rendered, success) {
            (Self::CartPole, ..) => None,
            (Self::LunarLander, false, true) => Some("LANDED"),
            (Self::LunarLander, false, false) => Some("CRASHED"),
            (Self::LunarLander, true, true) => Some("SUCCESS"),
            (Self::LunarLander, true, false) => Some("FAILED"),
        }
    }

    pub fn evaluation_options(&self, episodes: usize) -> EvaluationOptions {
        EvaluationOptions::new(episodes).with_success_threshold(self.success_threshold())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gym_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lunar_lander_is_solved_at_200() {
        let options = Scenario::LunarLander.evaluation_options(10);
        assert_eq!(options.success_threshold, Some(200.));
        assert_eq!(options.episodes, 10);
        assert!(options.deterministic);
    }

    #[test]
    fn cart_pole_has_no_success_notion() {
        assert_eq!(Scenario::CartPole.success_threshold(), None);
        assert_eq!(Scenario::CartPole.outcome_label(true, false), None);
    }

    #[test]
    fn labels_depend_on_rendering() {
        let lander = Scenario::LunarLander;
        assert_eq!(lander.outcome_label(true, false), Some("LANDED"));
        assert_eq!(lander.outcome_label(false, false), Some("CRASHED"));
        assert_eq!(lander.outcome_label(true, true), Some("SUCCESS"));
        assert_eq!(lander.outcome_label(false, true), Some("FAILED"));
    }
}
