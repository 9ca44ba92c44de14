//! Environment wrappers

use gridworld_core::{Action, Environment, Position, Step};

/// Step limit wrapper: marks the step that exhausts the limit as truncated
#[derive(Debug, Clone)]
pub struct StepLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps
    pub max_steps: usize,
    /// Current step count
    pub steps: usize,
}

impl<E> StepLimit<E> {
    /// Create a new step limit wrapper
    pub fn new(env: E, max_steps: usize) -> Self {
        Self {
            env,
            max_steps,
            steps: 0,
        }
    }

    /// Unwrap the inner environment
    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E> Environment for StepLimit<E>
where
    E: Environment,
{
    fn reset(&mut self) -> Position {
        self.steps = 0;
        self.env.reset()
    }

    fn step(&mut self, action: Action) -> Step {
        self.steps += 1;
        let mut step = self.env.step(action);

        if self.steps >= self.max_steps && !step.done {
            step.truncated = true;
        }

        step
    }

    fn position(&self) -> Position {
        self.env.position()
    }
}
