//! Policy iteration on a known grid model
//!
//! Alternates Jacobi policy evaluation with greedy improvement until the
//! policy is stable. Outer iterations feed the mutation schedule's global
//! step counter: when the schedule fires, the current iteration ends, the
//! walls are replaced and V and pi are re-initialised against the new layout.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gridworld_core::{
    Action, ActionSet, Agent, AgentMetrics, CancellationFlag, GridModel, PolicyIterationConfig,
    PolicyTable, Position, Result, Reward, Transition, ValueTable,
};
use gridworld_env::{ActiveEnvironment, GridWorld};

use crate::observer::{ImprovementEvent, NullObserver, SweepEvent, TrainingObserver};

/// Solver phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Sweeping V under the current policy
    Evaluating,
    /// Making the policy greedy with respect to V
    Improving,
    /// The last improvement changed nothing
    Converged,
}

/// An evaluation phase that hit the sweep cap before reaching the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NonConvergence {
    /// Outer iteration the phase belonged to
    pub iteration: usize,
    /// Sweeps performed
    pub sweeps: usize,
    /// Largest change of the final sweep
    pub last_delta: f64,
}

/// Outcome of one evaluation phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Sweeps performed
    pub sweeps: usize,
    /// Largest change of the final sweep
    pub last_delta: f64,
    /// Whether the final sweep changed less than the threshold
    pub converged: bool,
    /// Whether cancellation stopped the phase early
    pub interrupted: bool,
}

/// Outcome of one improvement pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Improvement {
    /// Cells whose distribution changed
    pub changed_cells: usize,
    /// True iff no distribution changed
    pub stable: bool,
}

/// Summary of a solver run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyIterationReport {
    /// The policy is stable
    pub converged: bool,
    /// Outer iterations, across the swap
    pub iterations: usize,
    /// Evaluation sweeps, across the swap
    pub evaluation_sweeps: usize,
    /// The wall mutation fired during the run
    pub swapped: bool,
    /// Evaluation phases cut off by the sweep cap
    pub non_convergence: Vec<NonConvergence>,
    /// The run stopped on cancellation
    pub interrupted: bool,
}

/// Non-wall, non-goal cells in row-major order
fn decision_states<M: GridModel + ?Sized>(model: &M) -> Vec<Position> {
    let mut states = Vec::new();
    for row in 0..model.height() {
        for col in 0..model.width() {
            let p = Position::new(row, col);
            if !model.is_wall(p) && !model.is_terminal(p) {
                states.push(p);
            }
        }
    }
    states
}

/// One-step lookahead `reward(s') + gamma * V(s')` for every action
fn lookahead<M: GridModel + ?Sized>(
    model: &M,
    values: &ValueTable,
    position: Position,
    discount: f64,
) -> [f64; 4] {
    Action::ALL.map(|action| {
        let (next, reward) = model.step(position, action);
        reward + discount * values.get(next)
    })
}

/// Jacobi policy evaluation.
///
/// Each sweep reads a frozen copy of V, so the result does not depend on
/// the order cells are visited. The goal is re-pinned to 0 after every sweep.
/// Stops once the largest change drops below the threshold, the sweep cap is
/// reached, or `cancel` is set.
pub fn evaluate_policy<M: GridModel + ?Sized>(
    model: &M,
    policy: &PolicyTable,
    values: &mut ValueTable,
    config: &PolicyIterationConfig,
    cancel: &CancellationFlag,
    mut on_sweep: impl FnMut(usize, f64),
) -> Evaluation {
    let states = decision_states(model);
    let mut last_delta = f64::INFINITY;

    for sweep in 0..config.max_evaluation_sweeps {
        if cancel.is_cancelled() {
            return Evaluation {
                sweeps: sweep,
                last_delta,
                converged: false,
                interrupted: true,
            };
        }

        let old = values.clone();
        for &s in &states {
            let q = lookahead(model, &old, s, config.discount);
            let v: f64 = Action::ALL
                .iter()
                .map(|a| policy.probability(s, *a) * q[a.index()])
                .sum();
            values.set(s, v);
        }
        values.pin_goal();

        last_delta = values.max_abs_diff(&old);
        on_sweep(sweep, last_delta);

        if last_delta < config.convergence_threshold {
            return Evaluation {
                sweeps: sweep + 1,
                last_delta,
                converged: true,
                interrupted: false,
            };
        }
    }

    Evaluation {
        sweeps: config.max_evaluation_sweeps,
        last_delta,
        converged: false,
        interrupted: false,
    }
}

/// Greedy improvement: every decision cell gets the uniform distribution
/// over its maximal one-step lookahead actions (exact ties kept).
pub fn improve_policy<M: GridModel + ?Sized>(
    model: &M,
    values: &ValueTable,
    policy: &mut PolicyTable,
    discount: f64,
) -> Improvement {
    let mut changed_cells = 0;
    for s in decision_states(model) {
        let best = ActionSet::maximal(lookahead(model, values, s, discount));
        if policy.set_distribution(s, best.uniform_distribution()) {
            changed_cells += 1;
        }
    }
    Improvement {
        changed_cells,
        stable: changed_cells == 0,
    }
}

/// Policy iteration solver over a (possibly mutating) grid world
#[derive(Debug, Clone)]
pub struct PolicyIterationSolver {
    config: PolicyIterationConfig,
    env: ActiveEnvironment,
    values: ValueTable,
    policy: PolicyTable,
    phase: Phase,
    rng: StdRng,
    cancel: CancellationFlag,
    report: PolicyIterationReport,
}

impl PolicyIterationSolver {
    /// Create a solver with V = v0 (goal 0) and an equiprobable policy
    pub fn new(config: PolicyIterationConfig, env: ActiveEnvironment) -> Result<Self> {
        config.validate()?;
        let (values, policy) = Self::initial_tables(&config, env.world());
        Ok(Self {
            rng: StdRng::seed_from_u64(config.random_seed),
            config,
            env,
            values,
            policy,
            phase: Phase::Evaluating,
            cancel: CancellationFlag::new(),
            report: PolicyIterationReport::default(),
        })
    }

    /// Share a cancellation flag with the caller
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn initial_tables(config: &PolicyIterationConfig, world: &GridWorld) -> (ValueTable, PolicyTable) {
        let (h, w) = (world.height(), world.width());
        (
            ValueTable::new(h, w, config.initial_value, world.goal()),
            PolicyTable::equiprobable(h, w),
        )
    }

    /// Run until the policy is stable, the iteration cap is hit, or cancelled
    pub fn run(&mut self) -> PolicyIterationReport {
        self.run_observed(NullObserver)
    }

    /// [`PolicyIterationSolver::run`] reporting sweeps, improvements and the
    /// swap to `observer`
    pub fn run_observed<O: TrainingObserver>(&mut self, mut observer: O) -> PolicyIterationReport {
        tracing::info!(
            discount = self.config.discount,
            threshold = self.config.convergence_threshold,
            "starting policy iteration"
        );

        while self.phase != Phase::Converged {
            if self.cancel.is_cancelled() {
                tracing::warn!(iterations = self.report.iterations, "policy iteration interrupted");
                self.report.interrupted = true;
                break;
            }
            if self
                .config
                .max_policy_iterations
                .is_some_and(|cap| self.report.iterations >= cap)
            {
                tracing::warn!(iterations = self.report.iterations, "policy iteration cap reached");
                break;
            }

            let iteration = self.report.iterations;
            self.phase = Phase::Evaluating;
            let world = self.env.current();
            let evaluation = evaluate_policy(
                world.as_ref(),
                &self.policy,
                &mut self.values,
                &self.config,
                &self.cancel,
                |sweep, max_delta| {
                    observer.on_sweep(&SweepEvent {
                        iteration,
                        sweep,
                        max_delta,
                    });
                },
            );
            self.report.evaluation_sweeps += evaluation.sweeps;
            if evaluation.interrupted {
                continue;
            }
            if !evaluation.converged {
                tracing::warn!(
                    iteration,
                    sweeps = evaluation.sweeps,
                    last_delta = evaluation.last_delta,
                    "policy evaluation did not converge"
                );
                self.report.non_convergence.push(NonConvergence {
                    iteration,
                    sweeps: evaluation.sweeps,
                    last_delta: evaluation.last_delta,
                });
            }

            self.phase = Phase::Improving;
            let improvement = improve_policy(world.as_ref(), &self.values, &mut self.policy, self.config.discount);
            self.report.iterations += 1;
            observer.on_improvement(&ImprovementEvent {
                iteration,
                changed_cells: improvement.changed_cells,
                stable: improvement.stable,
            });

            if let Some(swap) = self.env.advance(self.report.iterations) {
                observer.on_environment_swap(&swap);
                self.report.swapped = true;
                let (values, policy) = Self::initial_tables(&self.config, self.env.world());
                self.values = values;
                self.policy = policy;
                self.phase = Phase::Evaluating;
                continue;
            }

            if improvement.stable {
                self.phase = Phase::Converged;
                self.report.converged = true;
            }
        }

        tracing::info!(
            iterations = self.report.iterations,
            sweeps = self.report.evaluation_sweeps,
            converged = self.report.converged,
            swapped = self.report.swapped,
            "policy iteration finished"
        );
        self.report.clone()
    }

    /// Sample a trajectory from the start cell following pi.
    ///
    /// Actions are drawn from pi's distribution, so ties between best
    /// actions are broken by the solver's seeded RNG. Stops at the goal or
    /// after `max_steps` moves.
    pub fn rollout(&mut self, max_steps: usize) -> Result<Vec<Transition>> {
        let world = self.env.current();
        let mut position = world.start();
        let mut trajectory = Vec::new();

        while trajectory.len() < max_steps && !world.is_terminal(position) {
            let weights = WeightedIndex::<f64>::new(self.policy.distribution(position).iter())
                .map_err(anyhow::Error::from)?;
            let action = Action::ALL[weights.sample(&mut self.rng)];
            let (next, reward) = world.step(position, action);
            trajectory.push(Transition {
                position,
                action,
                reward: Reward(reward),
                next_position: next,
                done: world.is_terminal(next),
            });
            position = next;
        }
        Ok(trajectory)
    }

    /// Current value table
    #[must_use]
    pub fn value(&self) -> &ValueTable {
        &self.values
    }

    /// Current policy
    #[must_use]
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Shared handle to the world the solver currently plans on
    #[must_use]
    pub fn world(&self) -> Arc<GridWorld> {
        self.env.current()
    }

    /// The environment handle
    #[must_use]
    pub fn environment(&self) -> &ActiveEnvironment {
        &self.env
    }

    /// Report of the run so far
    #[must_use]
    pub fn report(&self) -> &PolicyIterationReport {
        &self.report
    }

    /// Solver configuration
    #[must_use]
    pub fn config(&self) -> &PolicyIterationConfig {
        &self.config
    }
}

impl Agent for PolicyIterationSolver {
    fn value(&self, position: Position) -> f64 {
        self.values.get(position)
    }

    fn best_actions(&self, position: Position) -> ActionSet {
        let world = self.env.world();
        if world.is_wall(position) || world.is_terminal(position) {
            ActionSet::empty()
        } else {
            self.policy.best_actions(position)
        }
    }

    fn metrics(&self) -> AgentMetrics {
        AgentMetrics {
            total_steps: self.report.iterations,
            total_episodes: self.report.evaluation_sweeps,
            avg_episode_reward: 0.0,
            environment_swapped: self.report.swapped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gridworld_env::layouts;

    fn notched() -> PolicyIterationSolver {
        let world = GridWorld::new(layouts::notched_3x3()).unwrap();
        PolicyIterationSolver::new(PolicyIterationConfig::default(), ActiveEnvironment::fixed(world)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let world = GridWorld::new(layouts::notched_3x3()).unwrap();
        let config = PolicyIterationConfig {
            discount: 1.0,
            ..Default::default()
        };
        assert!(PolicyIterationSolver::new(config, ActiveEnvironment::fixed(world)).is_err());
    }

    #[test]
    fn test_initial_tables() {
        let solver = notched();
        assert_eq!(solver.phase(), Phase::Evaluating);
        assert_relative_eq!(solver.value().get(Position::new(2, 2)), 0.0);
        assert_relative_eq!(solver.policy().probability(Position::new(0, 0), Action::Left), 0.25);
    }

    #[test]
    fn test_converges_on_notched_grid() {
        let mut solver = notched();
        let report = solver.run();
        assert!(report.converged);
        assert!(!report.swapped);
        assert!(report.non_convergence.is_empty());
        assert_eq!(solver.phase(), Phase::Converged);
        assert_relative_eq!(solver.value().get(Position::new(0, 0)), 7.29, epsilon = 0.1);
        assert_eq!(solver.greedy_action(Position::new(0, 0)), Some(Action::Down));
        assert!(solver.best_actions(Position::new(0, 1)).is_empty());
        assert!(solver.best_actions(Position::new(2, 2)).is_empty());
    }

    #[test]
    fn test_rollout_follows_shortest_path() {
        let mut solver = notched();
        solver.run();
        let path = solver.rollout(20).unwrap();
        assert_eq!(path.len(), 4);
        assert!(path.last().unwrap().done);
        assert_eq!(path[0].action, Action::Down);
    }

    #[test]
    fn test_sweep_cap_records_non_convergence() {
        let world = GridWorld::new(layouts::notched_3x3()).unwrap();
        let config = PolicyIterationConfig {
            max_evaluation_sweeps: 1,
            max_policy_iterations: Some(1),
            ..Default::default()
        };
        let mut solver = PolicyIterationSolver::new(config, ActiveEnvironment::fixed(world)).unwrap();
        let report = solver.run();
        assert!(!report.converged);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.non_convergence.len(), 1);
        assert_eq!(report.non_convergence[0].sweeps, 1);
    }

    #[test]
    fn test_cancelled_run_is_flagged() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let mut solver = notched().with_cancellation(cancel);
        let report = solver.run();
        assert!(report.interrupted);
        assert_eq!(report.iterations, 0);
    }
}
