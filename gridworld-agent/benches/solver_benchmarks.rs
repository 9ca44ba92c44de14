use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gridworld_agent::{PolicyIterationSolver, QLearningAgent};
use gridworld_core::{GridConfig, PolicyIterationConfig, QLearningConfig, RewardConfig};
use gridworld_env::{layouts, ActiveEnvironment, GridWorld};

fn policy_iteration_classic(c: &mut Criterion) {
    let (config, _) = layouts::classic();
    let world = GridWorld::new(config).unwrap();
    let solver_config = PolicyIterationConfig {
        max_policy_iterations: Some(100),
        ..Default::default()
    };

    c.bench_function("policy_iteration_classic", |b| {
        b.iter(|| {
            let env = ActiveEnvironment::fixed(world.clone());
            let mut solver = PolicyIterationSolver::new(solver_config.clone(), env).unwrap();
            black_box(solver.run())
        });
    });
}

fn q_learning_classic(c: &mut Criterion) {
    let (config, schedule) = layouts::classic();
    let world = GridWorld::new(GridConfig {
        rewards: RewardConfig::sparse(),
        ..config
    })
    .unwrap();

    c.bench_function("q_learning_classic_default_run", |b| {
        b.iter(|| {
            let env = ActiveEnvironment::scheduled(world.clone(), schedule.clone()).unwrap();
            let mut agent = QLearningAgent::new(QLearningConfig::default(), env).unwrap();
            black_box(agent.run())
        });
    });
}

criterion_group!(benches, policy_iteration_classic, q_learning_classic);
criterion_main!(benches);
