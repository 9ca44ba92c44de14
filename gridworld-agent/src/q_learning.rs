//! Tabular Q-learning with Watkins eligibility traces
//!
//! The agent learns Q(feature, action) by interacting with the active grid
//! world, with epsilon-greedy exploration and a per-episode linear epsilon
//! anneal. A global step counter spans the whole run: it caps the run at
//! `step_budget_per_run` steps and drives the wall mutation schedule.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gridworld_core::{
    ActionSet, ActionValueTable, Agent, AgentMetrics, CancellationFlag, EligibilityTraces,
    Environment, EpisodeRecord, EpsilonGreedy, FeatureIndex, FeatureIndexer, GridModel,
    PolicyTable, Position, QLearningConfig, Result, RunHistory, Selection, Terminal, Transition,
};
use gridworld_env::{ActiveEnvironment, EpisodeCursor, GridWorld, StepLimit};

use crate::observer::{NullObserver, StepEvent, TrainingObserver};
use crate::utils::ExplorationSchedule;

/// Summary of a Q-learning run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QLearningReport {
    /// Per-episode returns and step counts
    pub history: RunHistory,
    /// Global steps taken
    pub total_steps: usize,
    /// Global step at which the walls were replaced
    pub swap_step: Option<usize>,
    /// The run stopped on cancellation
    pub interrupted: bool,
}

/// Q-learning agent
#[derive(Debug, Clone)]
pub struct QLearningAgent {
    config: QLearningConfig,
    env: ActiveEnvironment,
    q: ActionValueTable,
    traces: EligibilityTraces,
    explorer: EpsilonGreedy,
    schedule: ExplorationSchedule,
    rng: StdRng,
    cancel: CancellationFlag,
    global_steps: usize,
    report: QLearningReport,
}

impl QLearningAgent {
    /// Create an agent with a zero Q-table sized to the world
    pub fn new(config: QLearningConfig, env: ActiveEnvironment) -> Result<Self> {
        config.validate()?;
        let indexer = FeatureIndexer::new(env.world().height(), env.world().width());
        Ok(Self {
            q: ActionValueTable::new(indexer),
            traces: EligibilityTraces::new(indexer),
            explorer: EpsilonGreedy::new(config.exploration_rate),
            schedule: ExplorationSchedule::new(
                config.exploration_rate,
                config.final_exploration_rate,
                config.anneal_episode_count,
            ),
            rng: StdRng::seed_from_u64(config.random_seed),
            cancel: CancellationFlag::new(),
            global_steps: 0,
            report: QLearningReport::default(),
            config,
            env,
        })
    }

    /// Share a cancellation flag with the caller
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Epsilon-greedy choice for `features` under the current epsilon
    pub fn sample_action(&mut self, features: FeatureIndex) -> Selection {
        self.explorer.select(&self.q, features, &mut self.rng)
    }

    /// Apply one Q(lambda) update for `transition` and return the TD error.
    ///
    /// `greedy` says whether the action was greedy; an exploratory action
    /// cuts the traces of earlier pairs. Terminal successors bootstrap 0.
    pub fn update(&mut self, transition: &Transition, greedy: bool) -> f64 {
        let f = self.q.features(transition.position);
        let bootstrap = if transition.done {
            0.0
        } else {
            self.q.max(self.q.features(transition.next_position))
        };
        let target = transition.reward.value() + self.config.discount * bootstrap;
        let td_error = target - self.q.get(f, transition.action);
        let step = self.config.learning_rate * td_error;

        if self.config.trace_decay == 0.0 {
            self.q.add(f, transition.action, step);
            return td_error;
        }

        if !greedy {
            self.traces.clear();
        }
        self.traces.visit(f, transition.action);
        self.q.add_scaled(step, &self.traces);
        self.traces.decay(self.config.discount * self.config.trace_decay);
        td_error
    }

    /// Run every episode of the configured budget
    pub fn run(&mut self) -> QLearningReport {
        self.run_observed(NullObserver)
    }

    /// [`QLearningAgent::run`] reporting steps, episodes and the swap to
    /// `observer`
    pub fn run_observed<O: TrainingObserver>(&mut self, mut observer: O) -> QLearningReport {
        tracing::info!(
            episodes = self.config.num_episodes,
            budget = self.config.step_budget_per_run,
            learning_rate = self.config.learning_rate,
            trace_decay = self.config.trace_decay,
            "starting q-learning"
        );

        let first = self.report.history.len();
        for episode in first..self.config.num_episodes {
            if self.cancel.is_cancelled() {
                tracing::warn!(episode, steps = self.global_steps, "q-learning interrupted");
                self.report.interrupted = true;
                break;
            }
            if self.global_steps >= self.config.step_budget_per_run {
                break;
            }

            let record = self.run_episode(episode, &mut observer);
            observer.on_episode_end(&record);
            self.report.history.push(record);
        }
        self.report.total_steps = self.global_steps;
        self.report.interrupted |= self.cancel.is_cancelled();

        if let Some((mean, std)) = self.report.history.return_stats() {
            tracing::info!(
                episodes = self.report.history.len(),
                steps = self.global_steps,
                mean_return = mean,
                std_return = std,
                success_rate = self.report.history.success_rate(),
                "q-learning finished"
            );
        }
        self.report.clone()
    }

    fn run_episode<O: TrainingObserver>(&mut self, episode: usize, observer: &mut O) -> EpisodeRecord {
        let epsilon = self.schedule.rate(episode);
        self.explorer.set_epsilon(epsilon);
        self.traces.clear();

        let cap = self.config.max_steps_per_episode.unwrap_or(usize::MAX);
        let mut cursor = StepLimit::new(EpisodeCursor::new(self.env.current()), cap);
        let mut position = cursor.reset();
        let mut total_reward = 0.0;

        let outcome = loop {
            if self.cancel.is_cancelled() || self.global_steps >= self.config.step_budget_per_run {
                break Terminal::Truncated;
            }

            let selection = self.sample_action(self.q.features(position));
            let step = cursor.step(selection.action);
            let transition = Transition {
                position,
                action: selection.action,
                reward: step.reward,
                next_position: step.position,
                done: step.done,
            };
            self.update(&transition, selection.greedy);

            self.global_steps += 1;
            total_reward += step.reward.value();
            observer.on_step(&StepEvent {
                global_step: self.global_steps,
                episode,
                position,
                action: selection.action,
                next_position: step.position,
                reward: step.reward.value(),
                epsilon: self.explorer.epsilon,
                generation: self.env.generation(),
            });
            position = step.position;

            let swap = self.env.advance(self.global_steps);
            if let Some(event) = &swap {
                self.report.swap_step = Some(event.at_step);
                self.schedule.reanchor(event.exploration_rate, episode + 1);
                self.explorer.set_epsilon(event.exploration_rate);
                observer.on_environment_swap(event);
            }

            if transition.done {
                break Terminal::Yes;
            }
            if swap.is_some() || step.truncated {
                break Terminal::Truncated;
            }
        };

        EpisodeRecord {
            episode,
            total_reward,
            steps: cursor.steps,
            outcome,
            epsilon,
        }
    }

    /// Greedy policy read off Q: uniform over each decision cell's maximal
    /// actions, zero rows on walls and the goal
    #[must_use]
    pub fn greedy_policy(&self) -> PolicyTable {
        let world = self.env.world();
        let mut policy = PolicyTable::equiprobable(world.height(), world.width());
        for p in world.positions() {
            policy.set_distribution(p, self.best_actions(p).uniform_distribution());
        }
        policy
    }

    /// The learned action-value table
    #[must_use]
    pub fn q_table(&self) -> &ActionValueTable {
        &self.q
    }

    /// Current eligibility traces
    #[must_use]
    pub fn traces(&self) -> &EligibilityTraces {
        &self.traces
    }

    /// Exploration rate currently in force
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.explorer.epsilon
    }

    /// Global steps taken so far
    #[must_use]
    pub fn global_steps(&self) -> usize {
        self.global_steps
    }

    /// Report of the run so far
    #[must_use]
    pub fn report(&self) -> &QLearningReport {
        &self.report
    }

    /// Shared handle to the world the agent currently acts in
    #[must_use]
    pub fn world(&self) -> Arc<GridWorld> {
        self.env.current()
    }

    /// The environment handle
    #[must_use]
    pub fn environment(&self) -> &ActiveEnvironment {
        &self.env
    }

    /// Agent configuration
    #[must_use]
    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }
}

impl Agent for QLearningAgent {
    fn value(&self, position: Position) -> f64 {
        self.q.max(self.q.features(position))
    }

    fn best_actions(&self, position: Position) -> ActionSet {
        let world = self.env.world();
        if world.is_wall(position) || world.is_terminal(position) {
            ActionSet::empty()
        } else {
            self.q.best_actions(self.q.features(position))
        }
    }

    fn metrics(&self) -> AgentMetrics {
        AgentMetrics {
            total_steps: self.global_steps,
            total_episodes: self.report.history.len(),
            avg_episode_reward: self.report.history.return_stats().map_or(0.0, |(mean, _)| mean),
            environment_swapped: self.report.swap_step.is_some(),
        }
    }
}

/// Cells visited by following `agent`'s greedy action from the start cell;
/// ties go to the first action in the fixed order
#[must_use]
pub fn greedy_path<A: Agent + ?Sized>(agent: &A, world: &GridWorld, max_steps: usize) -> Vec<Position> {
    let mut path = vec![world.start()];
    let mut position = world.start();
    while path.len() <= max_steps && !world.is_terminal(position) {
        let Some(action) = agent.greedy_action(position) else {
            break;
        };
        position = world.transition(position, action);
        path.push(position);
    }
    path
}
