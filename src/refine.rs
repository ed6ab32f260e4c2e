//! Location of event crossings inside a grid interval.

use crate::constants::refine::{DEFAULT_TOLERANCE, MAX_ITERATIONS};
use crate::event::{Direction, EventFunction, EventValue};
use crate::ode_shared::{Stepper, System};

use tracing::{debug, trace, warn};

/// A point of the trajectory together with the event value there.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketPoint<V> {
    pub x: f64,
    pub y: V,
    pub value: f64,
}

/// Located crossing of an event function.
#[derive(Debug, Clone, PartialEq)]
pub struct Crossing<V> {
    pub x: f64,
    pub y: V,
    /// Event value at `x`, close to zero when `converged` is true.
    pub value: f64,
    pub direction: Direction,
    pub terminal: bool,
    /// Number of trial points evaluated.
    pub iterations: usize,
    /// False when refinement was aborted or ran out of iterations.
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Left,
    Right,
}

/// Secant refinement of a sign-changing bracket.
///
/// Each trial point is reached by stepping from the left end of the bracket, so the
/// state at the crossing is as accurate as the stepper allows.
///
/// The secant update uses the Illinois modification: when the same end of the bracket is
/// kept twice in a row, its value is halved for the next estimate. If the bracket has not
/// halved in width over two trials, the next trial is the midpoint. Trial points are kept
/// at least `tolerance / 2` away from both ends, so a trial landing on the root closes the
/// bracket on the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refiner {
    /// Absolute x-distance at which the crossing is considered located.
    pub tolerance: f64,
    pub max_iter: usize,
}

impl Default for Refiner {
    fn default() -> Self {
        Refiner {
            tolerance: DEFAULT_TOLERANCE,
            max_iter: MAX_ITERATIONS,
        }
    }
}

impl Refiner {
    pub fn new(tolerance: f64, max_iter: usize) -> Self {
        Refiner {
            tolerance,
            max_iter,
        }
    }

    /// Narrows the bracket `[left, right]` until the crossing of `event` is located.
    ///
    /// `last` is the event output at `right`; its terminal flag and direction are
    /// reported when no trial point needs to be evaluated. Refinement never fails: a
    /// bracket narrower than the tolerance yields the end point with the smaller event
    /// value (the right one on ties), a non-finite secant estimate yields the right end
    /// point, and hitting the iteration limit yields the better end point unconverged.
    pub fn refine<V, F, S, E>(
        &self,
        f: &F,
        stepper: &mut S,
        event: &E,
        left: BracketPoint<V>,
        right: BracketPoint<V>,
        last: EventValue,
    ) -> Crossing<V>
    where
        V: Clone,
        F: System<V>,
        S: Stepper<V>,
        E: EventFunction<V> + ?Sized,
    {
        let mut left = left;
        let mut right = right;
        let mut last = last;

        // Illinois weighted values, only used for the secant estimate
        let mut f_left = left.value;
        let mut f_right = right.value;
        let mut kept: Option<Side> = None;

        let mut reference_width = (right.x - left.x).abs();
        let mut stalled = 0;

        for iteration in 0..self.max_iter {
            let width = (right.x - left.x).abs();
            if width < self.tolerance {
                return resolved(closer(left, right), last, iteration, true);
            }

            let (lo, hi) = if left.x < right.x {
                (left.x, right.x)
            } else {
                (right.x, left.x)
            };
            let mut x_new = if stalled >= 2 {
                0.5 * (left.x + right.x)
            } else {
                let slope = (f_left - f_right) / (left.x - right.x);
                let estimate = left.x - f_left / slope;
                if !estimate.is_finite() {
                    debug!(
                        x_left = left.x,
                        x_right = right.x,
                        "secant estimate is not finite, keeping the right end point"
                    );
                    return resolved(right, last, iteration, false);
                }
                if estimate < lo || estimate > hi {
                    0.5 * (left.x + right.x)
                } else {
                    estimate
                }
            };
            let margin = 0.5 * self.tolerance;
            x_new = x_new.max(lo + margin).min(hi - margin);

            let y_new = match stepper.step(f, left.x, &left.y, x_new) {
                Ok(y) => y,
                Err(failure) => {
                    warn!(
                        x_start = left.x,
                        x_end = x_new,
                        x_reached = failure.x,
                        error = %failure.error,
                        "stepper failed while refining an event"
                    );
                    failure.y
                }
            };
            last = event.evaluate(x_new, &y_new);
            trace!(iteration, x = x_new, value = last.value, "refinement trial point");
            let trial = BracketPoint {
                x: x_new,
                y: y_new,
                value: last.value,
            };

            if trial.value == 0.0 {
                return resolved(trial, last, iteration + 1, true);
            }

            if left.value * trial.value > 0.0 {
                left = trial;
                f_left = left.value;
                if kept == Some(Side::Right) {
                    f_right *= 0.5;
                }
                kept = Some(Side::Right);
            } else {
                right = trial;
                f_right = right.value;
                if kept == Some(Side::Left) {
                    f_left *= 0.5;
                }
                kept = Some(Side::Left);
            }

            let width = (right.x - left.x).abs();
            if width <= 0.5 * reference_width {
                reference_width = width;
                stalled = 0;
            } else {
                stalled += 1;
            }
        }

        debug!(
            max_iter = self.max_iter,
            x_left = left.x,
            value_left = left.value,
            x_right = right.x,
            value_right = right.value,
            "event refinement reached the iteration limit"
        );
        resolved(closer(left, right), last, self.max_iter, false)
    }
}

/// End point of the bracket with the smaller event value, the right one on ties.
fn closer<V>(left: BracketPoint<V>, right: BracketPoint<V>) -> BracketPoint<V> {
    if left.value.abs() < right.value.abs() {
        left
    } else {
        right
    }
}

fn resolved<V>(
    point: BracketPoint<V>,
    last: EventValue,
    iterations: usize,
    converged: bool,
) -> Crossing<V> {
    Crossing {
        x: point.x,
        y: point.y,
        value: point.value,
        direction: last.direction,
        terminal: last.terminal,
        iterations,
        converged,
    }
}
