//! The deep Q-network solver.

use crate::dqn::network::{Mlp, QFunction};
use crate::dqn::replay::ReplayBuffer;
use crate::env::{Environment, EnvironmentShape};
use crate::error::{Error, Result};
use crate::options::DqnOptions;
use crate::persistence::NetworkSnapshot;
use crate::policy::PolicyEngine;
use crate::transition::{Transition, TransitionRecord};
use crate::types::SolverStats;
use ndarray::{Array1, ArrayView1};

/// Q-learning with a function approximator over state feature vectors.
///
/// The environment's `number_of_states` is the length of the feature vector.
/// Every action is available in every state.
#[derive(Debug, Clone)]
pub struct DqnSolver<Q: QFunction = Mlp> {
    options: DqnOptions,
    shape: EnvironmentShape,
    actions: Vec<usize>,
    network: Q,
    replay: ReplayBuffer<Transition<Vec<f64>>>,
    engine: PolicyEngine,
    transition: TransitionRecord<Vec<f64>>,
    training_mode: bool,
    learn_tick: u64,
    stats: SolverStats,
}

impl DqnSolver<Mlp> {
    /// Builds a solver with the default network, seeded from the
    /// thread-local generator.
    pub fn new<E: Environment + ?Sized>(env: &E, options: DqnOptions) -> Result<Self> {
        Self::with_default_network(env, options, PolicyEngine::from_entropy())
    }

    /// Builds a reproducible solver with the default network.
    pub fn with_seed<E: Environment + ?Sized>(
        env: &E,
        options: DqnOptions,
        seed: u64,
    ) -> Result<Self> {
        Self::with_default_network(env, options, PolicyEngine::with_seed(seed))
    }

    fn with_default_network<E: Environment + ?Sized>(
        env: &E,
        options: DqnOptions,
        mut engine: PolicyEngine,
    ) -> Result<Self> {
        options.validate()?;
        let shape = EnvironmentShape::resolve(env)?;
        let network = Mlp::new(
            shape.number_of_states,
            options.hidden_units,
            shape.number_of_actions,
            engine.rng_mut(),
        );
        Self::with_network(env, options, network, engine)
    }
}

impl<Q: QFunction> DqnSolver<Q> {
    /// Builds a solver around a caller-provided network.
    ///
    /// The network's input and output sizes must match the environment.
    pub fn with_network<E: Environment + ?Sized>(
        env: &E,
        options: DqnOptions,
        network: Q,
        engine: PolicyEngine,
    ) -> Result<Self> {
        options.validate()?;
        let shape = EnvironmentShape::resolve(env)?;
        if network.input_size() != shape.number_of_states {
            return Err(Error::DimensionMismatch {
                expected: shape.number_of_states,
                actual: network.input_size(),
            });
        }
        if network.output_size() != shape.number_of_actions {
            return Err(Error::DimensionMismatch {
                expected: shape.number_of_actions,
                actual: network.output_size(),
            });
        }

        log::debug!(
            "Creating DQN solver: {} inputs, {} hidden, {} actions, replay capacity {}",
            shape.number_of_states,
            network.hidden_units(),
            shape.number_of_actions,
            options.experience_size
        );

        let mut solver = Self {
            actions: (0..shape.number_of_actions).collect(),
            replay: ReplayBuffer::new(options.experience_size),
            options,
            shape,
            network,
            engine,
            transition: TransitionRecord::new(),
            training_mode: true,
            learn_tick: 0,
            stats: SolverStats::default(),
        };
        solver.reset();
        Ok(solver)
    }

    /// Draws fresh network parameters, empties both memories and turns
    /// training mode back on.
    pub fn reset(&mut self) {
        self.network.reinitialize(self.engine.rng_mut());
        self.replay.clear();
        self.transition.clear();
        self.training_mode = true;
        self.learn_tick = 0;
        self.stats = SolverStats::default();

        log::debug!("DQN solver reset");
    }

    /// Picks an action for the feature vector `state` and shifts the
    /// transition window.
    pub fn decide(&mut self, state: &[f64]) -> Result<usize> {
        self.check_input(state)?;

        let epsilon = if self.training_mode {
            self.current_epsilon()
        } else {
            0.0
        };

        let q = self.network.forward(ArrayView1::from(state));
        let decision = self
            .engine
            .epsilon_greedy(epsilon, &self.actions, |a| q[a])
            .ok_or(Error::Config("environment has no actions".into()))?;

        self.transition.shift(state.to_vec(), decision.action());
        self.stats.decisions += 1;
        if decision.explored() {
            self.stats.explorations += 1;
        }

        Ok(decision.action())
    }

    /// Records the (clipped) `reward` for the last decision.
    ///
    /// In training mode with `alpha > 0` and a complete transition in the
    /// window, the previous reward is learned from first: one gradient step
    /// on the transition, then the replay buffer update, then the replay
    /// steps.
    pub fn learn(&mut self, reward: f64) {
        if self.training_mode && self.options.alpha > 0.0 {
            if let Some(transition) = self.transition.complete() {
                self.sgd_step(&transition);
                self.stats.updates += 1;
                self.remember(transition);
                self.replay();
            }
        }
        self.transition.set_reward(self.clip_reward(reward));
    }

    /// One gradient step on `transition`. Returns the (possibly clamped) TD
    /// error.
    pub fn learn_from_sarsa_tuple(&mut self, transition: &Transition<Vec<f64>>) -> Result<f64> {
        self.check_tuple(transition)?;
        Ok(self.sgd_step(transition))
    }

    fn check_tuple(&self, t: &Transition<Vec<f64>>) -> Result<()> {
        self.check_input(&t.s0)?;
        self.check_input(&t.s1)?;
        self.shape.check_action(t.a0)?;
        self.shape.check_action(t.a1)
    }

    fn sgd_step(&mut self, t: &Transition<Vec<f64>>) -> f64 {
        let q0 = self.network.forward(ArrayView1::from(t.s0.as_slice()));
        let q1 = self.network.forward(ArrayView1::from(t.s1.as_slice()));
        let q1_max = q1.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let target = t.r0 + self.options.gamma * q1_max;

        let mut td_error = q0[t.a0] - target;
        if self.options.do_loss_clipping {
            td_error = td_error.clamp(-self.options.loss_clamp, self.options.loss_clamp);
        }

        // Only the taken action carries an error.
        let mut gradient = Array1::zeros(self.shape.number_of_actions);
        gradient[t.a0] = td_error;
        self.network
            .backward(ArrayView1::from(t.s0.as_slice()), gradient.view());
        self.network.update(self.options.alpha);

        td_error
    }

    /// Counts a learn tick and keeps every `keep_experience_interval`-th
    /// transition.
    pub fn add_to_replay_memory(&mut self, transition: Transition<Vec<f64>>) -> Result<()> {
        self.check_tuple(&transition)?;
        self.remember(transition);
        Ok(())
    }

    fn remember(&mut self, transition: Transition<Vec<f64>>) {
        if self.learn_tick % self.options.keep_experience_interval as u64 == 0 {
            let evicted = self.replay.push(transition);
            if evicted.is_some() {
                log::trace!("Replay buffer full, evicted oldest transition");
            }
        }
        self.learn_tick += 1;
    }

    /// Performs `replay_steps` gradient steps on transitions sampled
    /// uniformly, with replacement, from the buffer. Returns the number of
    /// steps taken.
    pub fn replay(&mut self) -> usize {
        if self.replay.is_empty() {
            return 0;
        }

        let steps = self.options.replay_steps;
        for _ in 0..steps {
            let Some(transition) = self.replay.sample(self.engine.rng_mut()).cloned() else {
                continue;
            };
            self.sgd_step(&transition);
        }

        self.stats.replay_updates += steps as u64;
        steps
    }

    /// The exploration probability for the current learn tick.
    pub fn current_epsilon(&self) -> f64 {
        let period = self.options.epsilon_decay_period;
        if period == 0 {
            return self.options.epsilon;
        }
        let progress = (self.learn_tick as f64 / period as f64).min(1.0);
        let max = self.options.epsilon_max;
        let min = self.options.epsilon_min;
        (max - (max - min) * progress).max(min)
    }

    /// Clamps `reward` to `[-reward_clamp, reward_clamp]` when reward
    /// clipping is on.
    pub fn clip_reward(&self, reward: f64) -> f64 {
        if self.options.do_reward_clipping {
            reward.clamp(-self.options.reward_clamp, self.options.reward_clamp)
        } else {
            reward
        }
    }

    fn check_input(&self, state: &[f64]) -> Result<()> {
        if state.len() != self.shape.number_of_states {
            return Err(Error::DimensionMismatch {
                expected: self.shape.number_of_states,
                actual: state.len(),
            });
        }
        Ok(())
    }

    /// The network's action values for `state`.
    pub fn q_values(&self, state: &[f64]) -> Result<Array1<f64>> {
        self.check_input(state)?;
        Ok(self.network.forward(ArrayView1::from(state)))
    }

    pub fn training_mode(&self) -> bool {
        self.training_mode
    }

    /// Outside training mode `decide` never explores and `learn` only
    /// records the reward.
    pub fn set_training_mode(&mut self, training: bool) {
        self.training_mode = training;
    }

    pub fn network(&self) -> &Q {
        &self.network
    }

    pub fn replay_buffer(&self) -> &ReplayBuffer<Transition<Vec<f64>>> {
        &self.replay
    }

    pub fn transition(&self) -> &TransitionRecord<Vec<f64>> {
        &self.transition
    }

    /// Loads a complete window, e.g. to resume an interrupted episode. The
    /// next training `learn` steps on it.
    pub fn resume_from(&mut self, transition: Transition<Vec<f64>>) -> Result<()> {
        self.check_tuple(&transition)?;
        let Transition { s0, a0, r0, s1, a1 } = transition;
        self.transition = TransitionRecord::learning(s0, a0, r0, s1, a1);
        Ok(())
    }

    pub fn learn_tick(&self) -> u64 {
        self.learn_tick
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn options(&self) -> &DqnOptions {
        &self.options
    }

    pub fn shape(&self) -> &EnvironmentShape {
        &self.shape
    }

    pub fn number_of_states(&self) -> usize {
        self.shape.number_of_states
    }

    pub fn number_of_actions(&self) -> usize {
        self.shape.number_of_actions
    }

    /// Copies the network parameters out.
    pub fn export_parameters(&self) -> NetworkSnapshot {
        let parameters = self.network.parameters();
        log::info!("Exporting {} network parameters", parameters.len());
        NetworkSnapshot::new(
            self.network.input_size(),
            self.network.hidden_units(),
            self.network.output_size(),
            parameters,
        )
    }

    /// Overwrites the network parameters.
    ///
    /// Fails with [`Error::DimensionMismatch`] if the snapshot describes a
    /// different architecture.
    pub fn import_parameters(&mut self, snapshot: &NetworkSnapshot) -> Result<()> {
        let expected = [
            self.network.input_size(),
            self.network.hidden_units(),
            self.network.output_size(),
        ];
        let actual = [
            snapshot.input_size,
            snapshot.hidden_units,
            snapshot.output_size,
        ];
        for (expected, actual) in expected.into_iter().zip(actual) {
            if expected != actual {
                return Err(Error::DimensionMismatch { expected, actual });
            }
        }

        self.network.set_parameters(&snapshot.parameters)?;
        log::info!("Imported {} network parameters", snapshot.parameters.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::greedy_action;
    use crate::transition::Phase;
    use rand::SeedableRng;

    struct Features;

    impl Environment for Features {
        fn number_of_states(&self) -> Option<usize> {
            Some(4)
        }

        fn number_of_actions(&self) -> Option<usize> {
            Some(3)
        }

        fn allowed_actions(&self, _state: usize) -> Vec<usize> {
            vec![0, 1, 2]
        }
    }

    fn solver(options: DqnOptions) -> DqnSolver {
        DqnSolver::with_seed(&Features, options.with_hidden_units(8), 5).unwrap()
    }

    #[test]
    fn test_new_solver_is_reset() {
        let s = solver(DqnOptions::default());
        assert_eq!(s.number_of_states(), 4);
        assert_eq!(s.number_of_actions(), 3);
        assert!(s.training_mode());
        assert!(s.transition().is_empty());
        assert!(s.replay_buffer().is_empty());
        assert_eq!(s.learn_tick(), 0);
    }

    #[test]
    fn test_decide_checks_vector_length() {
        let mut s = solver(DqnOptions::default());
        assert!(matches!(
            s.decide(&[0.0, 1.0]),
            Err(Error::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
        let a = s.decide(&[0.0, 1.0, 0.5, 0.5]).unwrap();
        assert!(a < 3);
        assert_eq!(s.transition().phase(), Phase::Observing);
    }

    #[test]
    fn test_greedy_decision_matches_network() {
        let mut s = solver(DqnOptions::default().with_epsilon(0.0));
        let state = [0.2, -0.4, 0.9, 0.1];
        let q = s.q_values(&state).unwrap();
        let best = greedy_action(&[0, 1, 2], |a| q[a]).unwrap();
        for _ in 0..10 {
            assert_eq!(s.decide(&state).unwrap(), best);
        }
    }

    #[test]
    fn test_epsilon_decay_schedule() {
        let mut s = solver(DqnOptions::default().with_epsilon_decay(1.0, 0.1, 10));
        assert_eq!(s.current_epsilon(), 1.0);
        s.learn_tick = 5;
        assert!((s.current_epsilon() - 0.55).abs() < 1e-12);
        s.learn_tick = 50;
        assert!((s.current_epsilon() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_loss_clipping_bounds_td_error() {
        let mut s = solver(DqnOptions::default().with_loss_clipping(true, 0.5));
        let t = Transition::new(vec![0.0; 4], 1, 100.0, vec![0.0; 4], 0);
        let err = s.learn_from_sarsa_tuple(&t).unwrap();
        assert_eq!(err, -0.5);

        let bad = Transition::new(vec![0.0; 3], 1, 1.0, vec![0.0; 4], 0);
        assert!(s.learn_from_sarsa_tuple(&bad).is_err());
    }

    #[test]
    fn test_keep_experience_interval() {
        let mut options = DqnOptions::default();
        options.keep_experience_interval = 2;
        let mut s = solver(options);
        for i in 0..5 {
            s.add_to_replay_memory(Transition::new(vec![i as f64; 4], 0, 0.0, vec![0.0; 4], 0))
                .unwrap();
        }
        // Ticks 0, 2 and 4 are kept.
        assert_eq!(s.replay_buffer().len(), 3);
        assert_eq!(s.learn_tick(), 5);
    }

    #[test]
    fn test_replay_steps_counted() {
        let mut s = solver(DqnOptions::default().with_replay(10, 4));
        assert_eq!(s.replay(), 0);
        s.add_to_replay_memory(Transition::new(vec![0.1; 4], 2, 1.0, vec![0.2; 4], 0))
            .unwrap();
        assert_eq!(s.replay(), 4);
        assert_eq!(s.stats().replay_updates, 4);
    }

    #[test]
    fn test_tuple_units_reject_bad_transitions() {
        let mut s = solver(DqnOptions::default());
        let before = s.network().parameters();

        let short = Transition::new(vec![0.0; 3], 0, 1.0, vec![0.0; 4], 0);
        assert!(matches!(
            s.add_to_replay_memory(short.clone()),
            Err(Error::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(s.resume_from(short).is_err());

        let bad_action = Transition::new(vec![0.0; 4], 0, 1.0, vec![0.0; 4], 3);
        assert!(matches!(
            s.learn_from_sarsa_tuple(&bad_action),
            Err(Error::ActionOutOfRange { action: 3, .. })
        ));
        assert!(s.resume_from(bad_action).is_err());

        assert!(s.replay_buffer().is_empty());
        assert_eq!(s.learn_tick(), 0);
        assert!(s.transition().is_empty());
        assert_eq!(s.network().parameters(), before);
    }

    #[test]
    fn test_custom_network_must_fit() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let wrong = Mlp::new(5, 4, 3, &mut rng);
        assert!(matches!(
            DqnSolver::with_network(
                &Features,
                DqnOptions::default(),
                wrong,
                PolicyEngine::with_seed(0)
            ),
            Err(Error::DimensionMismatch {
                expected: 4,
                actual: 5
            })
        ));
    }
}
