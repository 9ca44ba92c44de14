use approx::assert_relative_eq;

use gridworld_agent::{
    evaluate_policy, improve_policy, ImprovementEvent, PolicyIterationSolver, SweepEvent,
    TrainingObserver,
};
use gridworld_core::trajectory::discounted_returns;
use gridworld_core::{
    Action, Agent, CancellationFlag, GridModel, PolicyIterationConfig, PolicyTable, Position,
    ValueTable,
};
use gridworld_env::{layouts, ActiveEnvironment, GridWorld, SwapEvent};

#[derive(Default)]
struct Recorder {
    deltas: Vec<(usize, f64)>,
    improvements: Vec<ImprovementEvent>,
    swaps: Vec<SwapEvent>,
}

impl TrainingObserver for Recorder {
    fn on_sweep(&mut self, event: &SweepEvent) {
        self.deltas.push((event.iteration, event.max_delta));
    }

    fn on_improvement(&mut self, event: &ImprovementEvent) {
        self.improvements.push(*event);
    }

    fn on_environment_swap(&mut self, event: &SwapEvent) {
        self.swaps.push(*event);
    }
}

fn solver(world: GridWorld, config: PolicyIterationConfig) -> PolicyIterationSolver {
    PolicyIterationSolver::new(config, ActiveEnvironment::fixed(world)).unwrap()
}

#[test]
fn notched_grid_takes_the_open_row() {
    let world = GridWorld::new(layouts::notched_3x3()).unwrap();
    let mut solver = solver(world, PolicyIterationConfig::default());
    let mut recorder = Recorder::default();
    let report = solver.run_observed(&mut recorder);

    assert!(report.converged);
    assert_relative_eq!(solver.value().get(Position::new(0, 0)), 0.9_f64.powi(3) * 10.0, epsilon = 0.1);
    assert_eq!(solver.greedy_action(Position::new(0, 0)), Some(Action::Down));
    assert_eq!(solver.greedy_action(Position::new(1, 0)), Some(Action::Down));
    assert_eq!(solver.greedy_action(Position::new(2, 0)), Some(Action::Right));
    assert_eq!(solver.greedy_action(Position::new(2, 1)), Some(Action::Right));
    assert!(recorder.improvements.last().unwrap().stable);
    assert_eq!(recorder.improvements.len(), report.iterations);
}

#[test]
fn rollout_return_matches_start_value() {
    let world = GridWorld::new(layouts::notched_3x3()).unwrap();
    let mut solver = solver(world, PolicyIterationConfig::default());
    solver.run();

    let path = solver.rollout(50).unwrap();
    let rewards: Vec<f64> = path.iter().map(|t| t.reward.value()).collect();
    let returns = discounted_returns(&rewards, 0.9);
    assert_relative_eq!(returns[0], solver.value().get(Position::new(0, 0)), epsilon = 0.1);
}

#[test]
fn goal_stays_zero_after_every_sweep() {
    let (config, _) = layouts::classic();
    let world = GridWorld::new(config).unwrap();
    let goal = world.goal();
    let one_sweep = PolicyIterationConfig {
        max_evaluation_sweeps: 1,
        ..Default::default()
    };
    let policy = PolicyTable::equiprobable(10, 10);
    let mut values = ValueTable::new(10, 10, 5.0, goal);
    let cancel = CancellationFlag::new();

    for _ in 0..30 {
        evaluate_policy(&world, &policy, &mut values, &one_sweep, &cancel, |_, _| {});
        assert_eq!(values.get(goal).to_bits(), 0.0_f64.to_bits());
    }
}

#[test]
fn one_sweep_reads_only_the_previous_values() {
    let world = GridWorld::new(layouts::notched_3x3()).unwrap();
    let one_sweep = PolicyIterationConfig {
        max_evaluation_sweeps: 1,
        ..Default::default()
    };
    let policy = PolicyTable::equiprobable(3, 3);
    let mut values = ValueTable::new(3, 3, 1.0, world.goal());
    evaluate_policy(&world, &policy, &mut values, &one_sweep, &CancellationFlag::new(), |_, _| {});

    // every move from these cells lands on a cell that held 1.0
    for p in [(0, 0), (0, 2), (1, 0), (2, 0)] {
        assert_relative_eq!(values.get(Position::from(p)), 0.9, epsilon = 1e-12);
    }
    // one of four moves enters the goal: (3 * 0.9 + 10) / 4
    for p in [(1, 2), (2, 1)] {
        assert_relative_eq!(values.get(Position::from(p)), 3.175, epsilon = 1e-12);
    }
    assert_relative_eq!(values.get(world.goal()), 0.0);
}

#[test]
fn evaluation_deltas_never_grow() {
    let (config, _) = layouts::classic();
    let world = GridWorld::new(config).unwrap();
    let tight = PolicyIterationConfig {
        convergence_threshold: 1e-6,
        ..Default::default()
    };
    let policy = PolicyTable::equiprobable(10, 10);
    let mut values = ValueTable::new(10, 10, 0.0, world.goal());
    let mut deltas = Vec::new();

    let evaluation = evaluate_policy(&world, &policy, &mut values, &tight, &CancellationFlag::new(), |_, d| {
        deltas.push(d);
    });

    assert!(evaluation.converged);
    assert_eq!(deltas.len(), evaluation.sweeps);
    for pair in deltas.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-12, "delta grew: {pair:?}");
    }
}

#[test]
fn improvement_never_lowers_values() {
    let (config, _) = layouts::classic();
    let world = GridWorld::new(config).unwrap();
    let tight = PolicyIterationConfig {
        convergence_threshold: 1e-10,
        ..Default::default()
    };
    let cancel = CancellationFlag::new();
    let mut policy = PolicyTable::equiprobable(10, 10);
    let mut values = ValueTable::new(10, 10, 0.0, world.goal());
    evaluate_policy(&world, &policy, &mut values, &tight, &cancel, |_, _| {});

    for _ in 0..20 {
        let previous = values.clone();
        let improvement = improve_policy(&world, &values, &mut policy, tight.discount);
        evaluate_policy(&world, &policy, &mut values, &tight, &cancel, |_, _| {});
        for p in world.decision_states() {
            assert!(values.get(p) >= previous.get(p) - 1e-6, "value dropped at {p}");
        }
        if improvement.stable {
            break;
        }
    }
}

#[test]
fn classic_layout_goes_through_the_gap() {
    let (config, _) = layouts::classic();
    let world = GridWorld::new(config).unwrap();
    let mut solver = solver(
        world,
        PolicyIterationConfig {
            max_policy_iterations: Some(100),
            ..Default::default()
        },
    );
    solver.run();

    assert_relative_eq!(solver.value().get(Position::new(0, 0)), 0.9_f64.powi(17) * 10.0, epsilon = 0.15);
    assert_eq!(solver.greedy_action(Position::new(1, 9)), Some(Action::Down));
    assert!(solver.best_actions(Position::new(2, 0)).is_empty());
}

#[test]
fn mutation_restarts_on_the_new_layout() {
    let (config, mut schedule) = layouts::classic();
    schedule.step_threshold = 2;
    let env = ActiveEnvironment::scheduled(GridWorld::new(config).unwrap(), schedule).unwrap();
    let mut solver = PolicyIterationSolver::new(
        PolicyIterationConfig {
            max_policy_iterations: Some(100),
            ..Default::default()
        },
        env,
    )
    .unwrap();
    let mut recorder = Recorder::default();
    let report = solver.run_observed(&mut recorder);

    assert!(report.swapped);
    assert_eq!(recorder.swaps.len(), 1);
    assert_eq!(recorder.swaps[0].at_step, 2);
    assert_eq!(solver.environment().generation(), 1);
    assert!(solver.world().is_wall(Position::new(2, 9)));
    assert_relative_eq!(solver.value().get(Position::new(0, 0)), 0.9_f64.powi(9) * 10.0, epsilon = 0.15);
    assert_eq!(solver.greedy_action(Position::new(0, 0)), Some(Action::Down));
    // sweeps after the swap restart from the re-initialised table
    assert!(recorder.deltas.iter().any(|(iteration, _)| *iteration >= 2));
}
