//! Train on the classic 10x10 layout (or a JSON-configured one) and write
//! run artifacts.
//!
//! Usage: `gridworld [qlearning|policy_iter] [config.json]`

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use gridworld_agent::{
    PolicyIterationSolver, QLearningAgent, RenderSnapshot, RunArtifacts, RunManifest,
    TracingObserver,
};
use gridworld_core::{
    CancellationFlag, GridConfig, GridModel, PolicyIterationConfig, QLearningConfig, RewardConfig,
};
use gridworld_env::{layouts, ActiveEnvironment, GridWorld, MutationScheduleConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    QLearning,
    PolicyIteration,
}

impl Strategy {
    fn name(self) -> &'static str {
        match self {
            Self::QLearning => "qlearning",
            Self::PolicyIteration => "policy_iter",
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "qlearning" => Ok(Self::QLearning),
            "policy_iter" => Ok(Self::PolicyIteration),
            other => bail!("unknown strategy {other:?}, expected qlearning or policy_iter"),
        }
    }
}

/// Everything a run needs; every field has a default
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RunConfig {
    grid: GridConfig,
    mutation: Option<MutationScheduleConfig>,
    policy_iteration: PolicyIterationConfig,
    q_learning: QLearningConfig,
    /// Q-learning learns from a goal-only signal
    q_learning_rewards: RewardConfig,
    output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        let (grid, mutation) = layouts::classic();
        Self {
            grid,
            mutation: Some(mutation),
            policy_iteration: PolicyIterationConfig::default(),
            q_learning: QLearningConfig::default(),
            q_learning_rewards: RewardConfig::sparse(),
            output_dir: PathBuf::from("runs"),
        }
    }
}

async fn load_config(path: &str) -> anyhow::Result<RunConfig> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {path}"))
}

fn train(
    strategy: Strategy,
    config: &RunConfig,
    cancel: CancellationFlag,
    started_at: DateTime<Utc>,
) -> anyhow::Result<(RunArtifacts, RenderSnapshot)> {
    match strategy {
        Strategy::QLearning => {
            let world = GridWorld::new(GridConfig {
                rewards: config.q_learning_rewards,
                ..config.grid.clone()
            })?;
            let env = ActiveEnvironment::from_parts(world, config.mutation.clone())?;
            let mut agent = QLearningAgent::new(config.q_learning.clone(), env)?.with_cancellation(cancel);
            let report = agent.run_observed(TracingObserver);

            let world = agent.world();
            let snapshot = RenderSnapshot::capture(&agent, &world, world.start());
            let mut manifest = RunManifest::new(strategy.name(), started_at, config)?;
            manifest.total_steps = report.total_steps;
            manifest.swapped = report.swap_step.is_some();
            manifest.interrupted = report.interrupted;
            let artifacts = RunArtifacts {
                q_table: Some(agent.q_table().as_array().clone()),
                ..RunArtifacts::new(manifest)
            }
            .with_history(&report.history);
            Ok((artifacts, snapshot))
        }
        Strategy::PolicyIteration => {
            let world = GridWorld::new(config.grid.clone())?;
            let env = ActiveEnvironment::from_parts(world, config.mutation.clone())?;
            let mut solver =
                PolicyIterationSolver::new(config.policy_iteration.clone(), env)?.with_cancellation(cancel);
            let report = solver.run_observed(TracingObserver);

            let world = solver.world();
            let path = solver.rollout(world.height() * world.width())?;
            let position = path.last().map_or(world.start(), |t| t.next_position);
            let snapshot = RenderSnapshot::capture(&solver, &world, position);
            let mut manifest = RunManifest::new(strategy.name(), started_at, config)?;
            manifest.total_steps = report.iterations;
            manifest.swapped = report.swapped;
            manifest.interrupted = report.interrupted;
            let artifacts = RunArtifacts {
                values: Some(solver.value().as_array().clone()),
                ..RunArtifacts::new(manifest)
            };
            Ok((artifacts, snapshot))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let strategy: Strategy = args.next().as_deref().unwrap_or("qlearning").parse()?;
    let config = match args.next() {
        Some(path) => load_config(&path).await?,
        None => RunConfig::default(),
    };

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current step");
            on_interrupt.cancel();
        }
    });

    let started_at = Utc::now();
    let output_dir = config.output_dir.clone();
    let (artifacts, snapshot) =
        tokio::task::spawn_blocking(move || train(strategy, &config, cancel, started_at)).await??;

    println!("{snapshot}");
    let dir = output_dir.join(artifacts.manifest.run_id.to_string());
    let written = artifacts.write(&dir).await?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_outlasts_the_wall_swap() {
        let config = RunConfig::default();
        let swap = config.mutation.as_ref().map(|m| m.step_threshold).unwrap();
        assert!(config.q_learning.step_budget_per_run > swap);
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in [Strategy::QLearning, Strategy::PolicyIteration] {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
        assert!("sarsa".parse::<Strategy>().is_err());
    }
}
