//! Options for the TD and DQN solvers.
//!
//! Both option structs deserialize from JSON with camelCase keys
//! (`qInitVal`, `numberOfPlanningSteps`, `doRewardClipping`, ...). Missing
//! keys take their default value.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The bootstrap target used by the tabular solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UpdateRule {
    /// Off-policy: bootstrap from `max_a Q(s1, a)`.
    #[default]
    #[serde(rename = "qlearn", alias = "qLearning")]
    QLearning,
    /// On-policy: bootstrap from `Q(s1, a1)`.
    #[serde(rename = "sarsa")]
    Sarsa,
}

/// How the Dyna planner picks the state-actions it backs up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlanningStrategy {
    /// Sample observed state-actions uniformly, with replacement.
    #[default]
    Uniform,
    /// Prioritized sweeping: back up the state-actions whose successors
    /// changed the most.
    Prioritized,
}

/// Configuration for [`TdSolver`](crate::td::TdSolver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TdOptions {
    /// Q-learning or SARSA.
    pub update: UpdateRule,
    /// Learning rate. 0 disables learning.
    pub alpha: f64,
    /// Exploration probability in training mode.
    pub epsilon: f64,
    /// Discount factor, `0 <= gamma < 1`.
    pub gamma: f64,
    /// Eligibility trace decay. 0 disables traces.
    pub lambda: f64,
    /// Step size of the smoothed policy update.
    pub beta: f64,
    /// Replacing (`true`) or accumulating (`false`) traces.
    pub replacing_traces: bool,
    /// Sample exploitation moves from the smoothed policy table instead of
    /// taking the argmax.
    pub smooth_policy_update: bool,
    /// Simulated updates per real update. 0 disables planning.
    pub number_of_planning_steps: usize,
    /// Initial value of every Q-table entry.
    pub q_init_val: f64,
    /// Dyna sampling strategy.
    pub planning_strategy: PlanningStrategy,
}

impl Default for TdOptions {
    fn default() -> Self {
        Self {
            update: UpdateRule::QLearning,
            alpha: 0.01,
            epsilon: 0.1,
            gamma: 0.75,
            lambda: 0.0,
            beta: 0.01,
            replacing_traces: true,
            smooth_policy_update: false,
            number_of_planning_steps: 0,
            q_init_val: 0.0,
            planning_strategy: PlanningStrategy::Uniform,
        }
    }
}

impl TdOptions {
    /// Loads options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Checks every field against its admissible range.
    pub fn validate(&self) -> Result<()> {
        check_non_negative("alpha", self.alpha)?;
        check_closed("epsilon", self.epsilon, 0.0, 1.0)?;
        check_discount(self.gamma)?;
        check_closed("lambda", self.lambda, 0.0, 1.0)?;
        check_closed("beta", self.beta, 0.0, 1.0)?;
        if !self.q_init_val.is_finite() {
            return Err(Error::Config("qInitVal must be finite".into()));
        }
        Ok(())
    }

    /// Sets the update rule.
    pub fn with_update(mut self, update: UpdateRule) -> Self {
        self.update = update;
        self
    }

    /// Sets the learning rate.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the exploration probability.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the discount factor.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Enables eligibility traces with the given decay.
    pub fn with_traces(mut self, lambda: f64, replacing: bool) -> Self {
        self.lambda = lambda;
        self.replacing_traces = replacing;
        self
    }

    /// Enables the smoothed policy with step size `beta`.
    pub fn with_smooth_policy(mut self, beta: f64) -> Self {
        self.smooth_policy_update = true;
        self.beta = beta;
        self
    }

    /// Enables Dyna planning.
    pub fn with_planning(mut self, steps: usize, strategy: PlanningStrategy) -> Self {
        self.number_of_planning_steps = steps;
        self.planning_strategy = strategy;
        self
    }

    /// Sets the initial Q value.
    pub fn with_q_init_val(mut self, q_init_val: f64) -> Self {
        self.q_init_val = q_init_val;
        self
    }
}

/// Configuration for [`DqnSolver`](crate::dqn::DqnSolver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DqnOptions {
    /// Hidden layer width of the default Q-network.
    #[serde(alias = "numberOfHiddenUnits")]
    pub hidden_units: usize,
    /// Learning rate of the gradient step. 0 disables learning.
    pub alpha: f64,
    /// Discount factor, `0 <= gamma < 1`.
    pub gamma: f64,
    /// Constant exploration probability, used when no decay period is set.
    pub epsilon: f64,
    /// Exploration probability at the start of a linear decay.
    pub epsilon_max: f64,
    /// Exploration probability once the decay period has elapsed.
    pub epsilon_min: f64,
    /// Learn ticks over which epsilon decays. 0 keeps `epsilon` constant.
    pub epsilon_decay_period: u64,
    /// Replay buffer capacity.
    pub experience_size: usize,
    /// Store every k-th full transition in the replay buffer.
    pub keep_experience_interval: usize,
    /// Extra replay updates per full learn call.
    pub replay_steps: usize,
    /// Clamp the TD error used as output gradient.
    pub do_loss_clipping: bool,
    pub loss_clamp: f64,
    /// Clamp rewards before storing them.
    pub do_reward_clipping: bool,
    pub reward_clamp: f64,
}

impl Default for DqnOptions {
    fn default() -> Self {
        Self {
            hidden_units: 100,
            alpha: 0.005,
            gamma: 0.9,
            epsilon: 0.05,
            epsilon_max: 1.0,
            epsilon_min: 0.1,
            epsilon_decay_period: 0,
            experience_size: 1_000_000,
            keep_experience_interval: 1,
            replay_steps: 10,
            do_loss_clipping: true,
            loss_clamp: 1.0,
            do_reward_clipping: true,
            reward_clamp: 1.0,
        }
    }
}

impl DqnOptions {
    /// Loads options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Checks every field against its admissible range.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_units == 0 {
            return Err(Error::Config("hiddenUnits must be greater than 0".into()));
        }
        check_non_negative("alpha", self.alpha)?;
        check_discount(self.gamma)?;
        check_closed("epsilon", self.epsilon, 0.0, 1.0)?;
        check_closed("epsilonMax", self.epsilon_max, 0.0, 1.0)?;
        check_closed("epsilonMin", self.epsilon_min, 0.0, self.epsilon_max)?;
        if self.experience_size == 0 {
            return Err(Error::Config("experienceSize must be greater than 0".into()));
        }
        if self.keep_experience_interval == 0 {
            return Err(Error::Config(
                "keepExperienceInterval must be greater than 0".into(),
            ));
        }
        check_positive("lossClamp", self.loss_clamp)?;
        check_positive("rewardClamp", self.reward_clamp)?;
        Ok(())
    }

    /// Sets the learning rate.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets a constant exploration probability.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self.epsilon_decay_period = 0;
        self
    }

    /// Decays epsilon linearly from `max` to `min` over `period` learn ticks.
    pub fn with_epsilon_decay(mut self, max: f64, min: f64, period: u64) -> Self {
        self.epsilon_max = max;
        self.epsilon_min = min;
        self.epsilon_decay_period = period;
        self
    }

    /// Sets the discount factor.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the hidden layer width.
    pub fn with_hidden_units(mut self, hidden_units: usize) -> Self {
        self.hidden_units = hidden_units;
        self
    }

    /// Sets the replay buffer capacity and the replay updates per learn call.
    pub fn with_replay(mut self, experience_size: usize, replay_steps: usize) -> Self {
        self.experience_size = experience_size;
        self.replay_steps = replay_steps;
        self
    }

    /// Enables or disables reward clipping.
    pub fn with_reward_clipping(mut self, enabled: bool, clamp: f64) -> Self {
        self.do_reward_clipping = enabled;
        self.reward_clamp = clamp;
        self
    }

    /// Enables or disables loss clipping.
    pub fn with_loss_clipping(mut self, enabled: bool, clamp: f64) -> Self {
        self.do_loss_clipping = enabled;
        self.loss_clamp = clamp;
        self
    }
}

fn check_closed(name: &str, value: f64, low: f64, high: f64) -> Result<()> {
    if !(low..=high).contains(&value) {
        return Err(Error::Config(format!(
            "{} must be within [{}, {}], got {}",
            name, low, high, value
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !(value >= 0.0 && value.is_finite()) {
        return Err(Error::Config(format!("{} must be >= 0, got {}", name, value)));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(Error::Config(format!("{} must be > 0, got {}", name, value)));
    }
    Ok(())
}

fn check_discount(gamma: f64) -> Result<()> {
    if !(0.0..1.0).contains(&gamma) {
        return Err(Error::Config(format!(
            "gamma must be within [0, 1), got {}",
            gamma
        )));
    }
    Ok(())
}
