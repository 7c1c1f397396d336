//! The tabular temporal-difference solver.

use crate::env::{ActionSpace, Environment, EnvironmentShape};
use crate::error::{Error, Result};
use crate::options::{PlanningStrategy, TdOptions, UpdateRule};
use crate::persistence::ValueTableSnapshot;
use crate::policy::{greedy_action, Decision, PolicyEngine, PolicyTable};
use crate::td::model::{TransitionModel, PRIORITY_THRESHOLD};
use crate::td::value_table::{EligibilityTrace, ValueTable};
use crate::transition::{Transition, TransitionRecord};
use crate::types::SolverStats;

/// Q-learning / SARSA over a discrete state-action table, with optional
/// eligibility traces and Dyna planning.
///
/// The driver alternates [`decide`](Self::decide) and [`learn`](Self::learn).
/// The reward passed to `learn` is held back and used by the next full
/// update, once the state it led to and the action chosen there are known.
#[derive(Debug, Clone)]
pub struct TdSolver {
    options: TdOptions,
    shape: EnvironmentShape,
    actions: ActionSpace,
    values: ValueTable,
    traces: EligibilityTrace,
    model: TransitionModel,
    random_policy: PolicyTable,
    policy: PolicyTable,
    engine: PolicyEngine,
    transition: TransitionRecord<usize>,
    training_mode: bool,
    /// Whether the pick stored in the window as `a1` was exploratory.
    explored: bool,
    stats: SolverStats,
}

impl TdSolver {
    /// Builds a solver for `env`, seeded from the thread-local generator.
    pub fn new<E: Environment + ?Sized>(env: &E, options: TdOptions) -> Result<Self> {
        Self::with_engine(env, options, PolicyEngine::from_entropy())
    }

    /// Builds a reproducible solver.
    pub fn with_seed<E: Environment + ?Sized>(
        env: &E,
        options: TdOptions,
        seed: u64,
    ) -> Result<Self> {
        Self::with_engine(env, options, PolicyEngine::with_seed(seed))
    }

    /// Builds a solver around an existing policy engine.
    pub fn with_engine<E: Environment + ?Sized>(
        env: &E,
        options: TdOptions,
        engine: PolicyEngine,
    ) -> Result<Self> {
        options.validate()?;
        let shape = EnvironmentShape::resolve(env)?;
        let actions = ActionSpace::resolve(env, &shape)?;

        log::debug!(
            "Creating TD solver: {} states, {} actions, update={:?}, planning steps={}",
            shape.number_of_states,
            shape.number_of_actions,
            options.update,
            options.number_of_planning_steps
        );

        let random_policy = PolicyTable::uniform(&shape, &actions);
        let mut solver = Self {
            values: ValueTable::filled(&shape, options.q_init_val),
            traces: EligibilityTrace::zeros(&shape),
            model: TransitionModel::new(&shape),
            policy: random_policy.clone(),
            random_policy,
            options,
            shape,
            actions,
            engine,
            transition: TransitionRecord::new(),
            training_mode: true,
            explored: false,
            stats: SolverStats::default(),
        };
        solver.reset();
        Ok(solver)
    }

    /// Reinitialises every learned and remembered quantity and turns training
    /// mode back on.
    pub fn reset(&mut self) {
        self.values = ValueTable::filled(&self.shape, self.options.q_init_val);
        self.traces = EligibilityTrace::zeros(&self.shape);
        self.model.clear();
        self.random_policy = PolicyTable::uniform(&self.shape, &self.actions);
        self.policy = self.random_policy.clone();
        self.transition.clear();
        self.training_mode = true;
        self.explored = false;
        self.stats = SolverStats::default();

        log::debug!("TD solver reset ({} table entries)", self.values.len());
    }

    /// Picks an action for `state` and shifts the transition window.
    ///
    /// With probability `epsilon` (0 outside training mode) the action is
    /// drawn from the uniform random policy; otherwise it is the greedy
    /// action, or a draw from the smoothed policy when
    /// `smooth_policy_update` is on.
    pub fn decide(&mut self, state: usize) -> Result<usize> {
        self.shape.check_state(state)?;
        let allowed = self.actions.allowed(state);
        if allowed.is_empty() {
            return Err(Error::NoAllowedActions(state));
        }

        let epsilon = if self.training_mode {
            self.options.epsilon
        } else {
            0.0
        };

        let decision = if self.engine.explore(epsilon) {
            self.random_policy
                .sample(state, allowed, &mut self.engine)
                .map(Decision::Explore)
        } else if self.options.smooth_policy_update {
            self.policy
                .sample(state, allowed, &mut self.engine)
                .map(Decision::Exploit)
        } else {
            let values = &self.values;
            greedy_action(allowed, |a| values.get(state, a)).map(Decision::Exploit)
        };
        let decision = decision.ok_or(Error::NoAllowedActions(state))?;

        self.transition.shift(state, decision.action());
        self.explored = decision.explored();
        self.stats.decisions += 1;
        if decision.explored() {
            self.stats.explorations += 1;
        }

        Ok(decision.action())
    }

    /// Records `reward` for the last decision.
    ///
    /// When the window holds a complete transition and `alpha > 0`, the
    /// previous reward is learned from first: the tuple update, then the
    /// model update, then planning.
    pub fn learn(&mut self, reward: f64) {
        if self.options.alpha > 0.0 {
            if let Some(transition) = self.transition.complete() {
                self.update_from_tuple(&transition, self.options.gamma);
                self.record_model(&transition);
                if self.options.number_of_planning_steps > 0 {
                    self.plan();
                }
            }
        }
        self.transition.set_reward(reward);
    }

    /// One TD backup of `transition` with discount `gamma`, using the
    /// configured traces. Returns the TD error.
    ///
    /// Fails without touching the table if a state or action of the tuple is
    /// out of range.
    pub fn learn_from_tuple(
        &mut self,
        transition: &Transition<usize>,
        gamma: f64,
    ) -> Result<f64> {
        self.check_tuple(transition)?;
        Ok(self.update_from_tuple(transition, gamma))
    }

    fn update_from_tuple(&mut self, transition: &Transition<usize>, gamma: f64) -> f64 {
        self.stats.updates += 1;
        self.backup(transition, gamma, self.options.lambda)
    }

    fn check_tuple(&self, t: &Transition<usize>) -> Result<()> {
        self.shape.check_state(t.s0)?;
        self.shape.check_action(t.a0)?;
        self.shape.check_state(t.s1)?;
        self.shape.check_action(t.a1)
    }

    fn backup(&mut self, t: &Transition<usize>, gamma: f64, lambda: f64) -> f64 {
        let next_allowed = self.actions.allowed(t.s1);
        let bootstrap = match self.options.update {
            UpdateRule::QLearning => self.values.max_over(t.s1, next_allowed),
            UpdateRule::Sarsa if next_allowed.is_empty() => 0.0,
            UpdateRule::Sarsa => self.values.get(t.s1, t.a1),
        };
        let target = t.r0 + gamma * bootstrap;
        let delta = target - self.values.get(t.s0, t.a0);
        let scale = self.options.alpha * delta;
        let prioritized = self.prioritized();

        if lambda > 0.0 {
            self.traces.mark(t.s0, t.a0, self.options.replacing_traces);

            // Per state: the largest single change, and the summed changes
            // that count toward predecessor priorities.
            let ns = self.shape.number_of_states;
            let mut largest = vec![0.0_f64; ns];
            let mut queued = vec![0.0_f64; ns];
            for (ix, &e) in self.traces.as_slice().iter().enumerate() {
                let change = (scale * e).abs();
                let state = ix % ns;
                largest[state] = f64::max(largest[state], change);
                if change >= PRIORITY_THRESHOLD {
                    queued[state] += change;
                }
            }

            self.values.apply_traces(&self.traces, scale);
            for (state, (&change, &priority)) in largest.iter().zip(&queued).enumerate() {
                if prioritized && priority > 0.0 {
                    self.model.add_priority_for_predecessors(state, priority);
                }
                if change > PRIORITY_THRESHOLD {
                    self.update_policy(state);
                }
            }

            self.traces.decay(gamma * lambda);
            if self.options.update == UpdateRule::QLearning && self.explored {
                // Off-policy: the exploratory a1 breaks the greedy chain.
                self.traces.clear();
            }
        } else {
            self.values.add(t.s0, t.a0, scale);
            if prioritized {
                self.model.add_priority_for_predecessors(t.s0, scale.abs());
            }
            self.update_policy(t.s0);
        }

        delta
    }

    fn prioritized(&self) -> bool {
        self.options.planning_strategy == PlanningStrategy::Prioritized
            && self.options.number_of_planning_steps > 0
    }

    fn update_policy(&mut self, state: usize) {
        let allowed = self.actions.allowed(state);
        let row = self.values.row(state, allowed);
        let step = self.options.smooth_policy_update.then_some(self.options.beta);
        self.policy.move_toward_greedy(state, allowed, &row, step);
    }

    /// Stores the outcome of `(s0, a0)` in the transition model.
    pub fn update_model(&mut self, transition: &Transition<usize>) -> Result<()> {
        self.check_tuple(transition)?;
        self.record_model(transition);
        Ok(())
    }

    fn record_model(&mut self, t: &Transition<usize>) {
        self.model.record(t.s0, t.a0, t.r0, t.s1);
    }

    /// Runs the Dyna planner and returns the number of simulated updates.
    ///
    /// Uniform planning performs exactly `number_of_planning_steps` updates
    /// once the model has an entry. Prioritized planning performs at most
    /// that many, one per queued state-action. Simulated updates never use
    /// traces.
    pub fn plan(&mut self) -> usize {
        let steps = self.options.number_of_planning_steps;
        if steps == 0 || self.model.is_empty() {
            return 0;
        }

        let picks: Vec<(usize, usize)> = match self.options.planning_strategy {
            PlanningStrategy::Uniform => (0..steps)
                .filter_map(|_| self.model.sample_uniform(self.engine.rng_mut()))
                .collect(),
            PlanningStrategy::Prioritized => self.model.take_top_priorities(steps),
        };

        let mut performed = 0;
        for (state, action) in picks {
            let Some(entry) = self.model.get(state, action) else {
                continue;
            };
            let next_action = self.planned_action(entry.next_state).unwrap_or(0);
            let simulated = Transition::new(
                state,
                action,
                entry.reward,
                entry.next_state,
                next_action,
            );
            let delta = self.backup(&simulated, self.options.gamma, 0.0);
            log::trace!(
                "Planning backup ({}, {}) -> {}: delta={:.6}",
                state,
                action,
                entry.next_state,
                delta
            );
            performed += 1;
        }

        self.stats.planning_updates += performed as u64;
        performed
    }

    /// The simulated next action in `state`: greedy, or drawn from the
    /// smoothed policy.
    fn planned_action(&mut self, state: usize) -> Option<usize> {
        let allowed = self.actions.allowed(state);
        if self.options.smooth_policy_update {
            self.policy.sample(state, allowed, &mut self.engine)
        } else {
            let values = &self.values;
            greedy_action(allowed, |a| values.get(state, a))
        }
    }

    pub fn training_mode(&self) -> bool {
        self.training_mode
    }

    /// Outside training mode `decide` never explores. Learning still runs.
    pub fn set_training_mode(&mut self, training: bool) {
        self.training_mode = training;
    }

    /// `Q(state, action)`.
    pub fn q_value(&self, state: usize, action: usize) -> Result<f64> {
        self.shape.check_state(state)?;
        self.shape.check_action(action)?;
        Ok(self.values.get(state, action))
    }

    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    /// The uniform random policy computed at reset.
    pub fn random_policy(&self) -> &PolicyTable {
        &self.random_policy
    }

    /// The greedy (or smoothed) policy.
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn model(&self) -> &TransitionModel {
        &self.model
    }

    pub fn traces(&self) -> &EligibilityTrace {
        &self.traces
    }

    pub fn transition(&self) -> &TransitionRecord<usize> {
        &self.transition
    }

    /// Loads a complete window, e.g. to resume an interrupted episode. The
    /// next `learn` backs it up.
    ///
    /// `a1` is treated as a greedy pick.
    pub fn resume_from(&mut self, transition: Transition<usize>) -> Result<()> {
        self.check_tuple(&transition)?;
        self.transition = TransitionRecord::learning(
            transition.s0,
            transition.a0,
            transition.r0,
            transition.s1,
            transition.a1,
        );
        self.explored = false;
        Ok(())
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn options(&self) -> &TdOptions {
        &self.options
    }

    pub fn shape(&self) -> &EnvironmentShape {
        &self.shape
    }

    /// Copies the Q-table out.
    pub fn export_values(&self) -> ValueTableSnapshot {
        log::info!("Exporting {} Q values", self.values.len());
        ValueTableSnapshot::new(
            self.shape.number_of_states,
            self.shape.number_of_actions,
            self.values.as_slice().to_vec(),
        )
    }

    /// Replaces the Q-table and makes the policy greedy with respect to it.
    ///
    /// Fails with [`Error::DimensionMismatch`] if the snapshot was taken from
    /// a different state-action space.
    pub fn import_values(&mut self, snapshot: &ValueTableSnapshot) -> Result<()> {
        snapshot.check_shape(self.shape.number_of_states, self.shape.number_of_actions)?;
        self.values.replace(snapshot.values.clone());

        for state in 0..self.shape.number_of_states {
            let allowed = self.actions.allowed(state);
            let row = self.values.row(state, allowed);
            self.policy.move_toward_greedy(state, allowed, &row, None);
        }

        log::info!("Imported {} Q values", snapshot.values.len());
        Ok(())
    }
}
