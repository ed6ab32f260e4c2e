//! Shared traits and structures for the steppers and the event driver.

use std::fmt;
use thiserror::Error;

/// Trait needed to be implemented by the user.
pub trait System<V> {
    /// System of ordinary differential equations.
    fn system(&self, x: f64, y: &V, dy: &mut V);
}

impl<V, F> System<V> for F
where
    F: Fn(f64, &V, &mut V),
{
    fn system(&self, x: f64, y: &V, dy: &mut V) {
        self(x, y, dy)
    }
}

/// Advances the state of a system between two values of the independent variable.
pub trait Stepper<V> {
    /// Integrates `f` from `(x, y)` to `x_end` and returns the state at `x_end`.
    ///
    /// On failure, the returned [`StepFailure`] holds the point the stepper reached
    /// so that the caller can decide whether to carry on from there.
    fn step<F: System<V>>(&mut self, f: &F, x: f64, y: &V, x_end: f64)
        -> Result<V, StepFailure<V>>;

    /// Statistics accumulated over all calls to [`Stepper::step`].
    fn stats(&self) -> Stats;

    /// Clears the accumulated statistics.
    fn reset_stats(&mut self);
}

/// Enumeration of the errors that may arise while stepping.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StepError {
    #[error("Stopped at x = {x}. Need more than {n_step} steps.")]
    MaxNumStepReached { x: f64, n_step: u32 },
    #[error("Stopped at x = {x}. Step size underflow.")]
    StepSizeUnderflow { x: f64 },
    #[error("The problem seems to become stiff at x = {x}.")]
    StiffnessDetected { x: f64 },
    #[error("The state is no longer finite at x = {x}.")]
    NonFiniteState { x: f64 },
}

/// State reached by a stepper that could not complete its interval.
#[derive(Debug, Clone)]
pub struct StepFailure<V> {
    /// Value of the independent variable where stepping stopped.
    pub x: f64,
    /// State at `x`.
    pub y: V,
    pub error: StepError,
}

/// Enumeration of the errors that prevent an integration from starting.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IntegrationError {
    #[error("Invalid argument: the grid needs at least two points, got {len}.")]
    GridTooShort { len: usize },
    #[error("Invalid argument: the grid is not strictly increasing at index {index}.")]
    NonMonotonicGrid { index: usize },
    #[error("Invalid argument: the grid value at index {index} is not finite.")]
    NonFiniteGrid { index: usize },
    #[error("Invalid argument: tolerance must be positive and finite, got {tolerance}.")]
    InvalidTolerance { tolerance: f64 },
}

/// Contains some statistics of the integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub num_eval: u32,
    pub accepted_steps: u32,
    pub rejected_steps: u32,
    pub event_evals: u32,
    pub refine_iterations: u32,
}

impl Stats {
    pub(crate) fn new() -> Stats {
        Stats::default()
    }

    /// Adds the stepper counters of `other` to `self`.
    pub(crate) fn merge_steps(&mut self, other: Stats) {
        self.num_eval += other.num_eval;
        self.accepted_steps += other.accepted_steps;
        self.rejected_steps += other.rejected_steps;
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of function evaluations: {}", self.num_eval)?;
        writeln!(f, "Number of accepted steps: {}", self.accepted_steps)?;
        writeln!(f, "Number of rejected steps: {}", self.rejected_steps)?;
        writeln!(f, "Number of event evaluations: {}", self.event_evals)?;
        write!(f, "Number of refinement iterations: {}", self.refine_iterations)
    }
}
