//! Integration over a caller supplied grid with event location.

use crate::constants::refine::{DEFAULT_TOLERANCE, MAX_ITERATIONS};
use crate::event::{sign_changed, EventFunction};
use crate::ode_shared::{IntegrationError, Stats, Stepper, System};
use crate::refine::{BracketPoint, Refiner};
use crate::solution::{EventRecord, Solution};

use tracing::{debug, warn};

/// Structure containing the parameters for the integration with events.
pub struct EventDriver<'a, V, F, S>
where
    F: System<V>,
    S: Stepper<V>,
{
    f: F,
    stepper: S,
    x_grid: Vec<f64>,
    y0: V,
    events: Vec<Box<dyn EventFunction<V> + 'a>>,
    refiner: Refiner,
    solution: Solution<V>,
}

impl<'a, V, F, S> EventDriver<'a, V, F, S>
where
    V: Clone,
    F: System<V>,
    S: Stepper<V>,
{
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `f`       - Structure implementing the System<V> trait
    /// * `stepper` - Stepper used between grid points and to reach trial points
    /// * `x_grid`  - Strictly increasing values of the independent variable at which the state is reported
    /// * `y0`      - Initial value of the dependent variable(s), at `x_grid[0]`
    ///
    pub fn new(f: F, stepper: S, x_grid: Vec<f64>, y0: V) -> Self {
        EventDriver {
            f,
            stepper,
            x_grid,
            y0,
            events: Vec::new(),
            refiner: Refiner::new(DEFAULT_TOLERANCE, MAX_ITERATIONS),
            solution: Solution::default(),
        }
    }

    /// Registers an event function. Events are indexed in registration order.
    pub fn event<E>(mut self, event: E) -> Self
    where
        E: EventFunction<V> + 'a,
    {
        self.events.push(Box::new(event));
        self
    }

    /// Registers several event functions at once.
    pub fn events<I>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn EventFunction<V> + 'a>>,
    {
        self.events.extend(events);
        self
    }

    /// Sets the absolute x-tolerance used to locate crossings. Default is 1e-6.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.refiner.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of trial points per crossing. Default is 100.
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.refiner.max_iter = max_iter;
        self
    }

    /// Checks the grid and the tolerance.
    fn validate(&self) -> Result<(), IntegrationError> {
        if self.x_grid.len() < 2 {
            return Err(IntegrationError::GridTooShort {
                len: self.x_grid.len(),
            });
        }
        if let Some(index) = self.x_grid.iter().position(|x| !x.is_finite()) {
            return Err(IntegrationError::NonFiniteGrid { index });
        }
        if let Some(index) = self.x_grid.windows(2).position(|w| w[1] <= w[0]) {
            return Err(IntegrationError::NonMonotonicGrid { index: index + 1 });
        }
        let tolerance = self.refiner.tolerance;
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(IntegrationError::InvalidTolerance { tolerance });
        }
        Ok(())
    }

    /// Core integration method.
    ///
    /// Any previous output is discarded, so calling it again with the same inputs gives the
    /// same results.
    pub fn integrate(&mut self) -> Result<Stats, IntegrationError> {
        self.validate()?;
        self.stepper.reset_stats();

        let mut solution = Solution::with_capacity(self.events.len(), self.x_grid.len());
        let mut stats = Stats::new();

        // Save initial values
        let x0 = self.x_grid[0];
        solution.push(x0, self.y0.clone());
        for (j, event) in self.events.iter().enumerate() {
            solution.event_values[(j, 0)] = event.evaluate(x0, &self.y0).value;
            stats.event_evals += 1;
        }

        'grid: for i in 0..self.x_grid.len() - 1 {
            let (x_prev, x_next) = (self.x_grid[i], self.x_grid[i + 1]);
            let y_prev = solution.y_out[i].clone();

            let y_next = match self.stepper.step(&self.f, x_prev, &y_prev, x_next) {
                Ok(y) => y,
                Err(failure) => {
                    warn!(
                        x_start = x_prev,
                        x_end = x_next,
                        x_reached = failure.x,
                        error = %failure.error,
                        "stepper failed, continuing with the state it reached"
                    );
                    failure.y
                }
            };
            solution.push(x_next, y_next.clone());

            for (j, event) in self.events.iter().enumerate() {
                let output = event.evaluate(x_next, &y_next);
                stats.event_evals += 1;
                solution.event_values[(j, i + 1)] = output.value;

                let value_prev = solution.event_values[(j, i)];
                if !sign_changed(value_prev, output.value) {
                    continue;
                }

                let crossing = self.refiner.refine(
                    &self.f,
                    &mut self.stepper,
                    &**event,
                    BracketPoint {
                        x: x_prev,
                        y: y_prev.clone(),
                        value: value_prev,
                    },
                    BracketPoint {
                        x: x_next,
                        y: y_next.clone(),
                        value: output.value,
                    },
                    output,
                );
                stats.event_evals += crossing.iterations as u32;
                stats.refine_iterations += crossing.iterations as u32;

                if !crossing.direction.accepts(value_prev, output.value) {
                    debug!(event = j, x = crossing.x, "crossing rejected by direction filter");
                    continue;
                }
                debug!(
                    event = j,
                    x = crossing.x,
                    terminal = crossing.terminal,
                    converged = crossing.converged,
                    "event located"
                );
                solution.events.push(EventRecord {
                    x: crossing.x,
                    y: crossing.y.clone(),
                    index: j,
                });

                if crossing.terminal {
                    solution.replace_last(crossing.x, crossing.y);
                    solution.terminated = true;
                    break 'grid;
                }
            }
        }

        Ok(self.finish(solution, stats))
    }

    fn finish(&mut self, mut solution: Solution<V>, mut stats: Stats) -> Stats {
        stats.merge_steps(self.stepper.stats());
        solution.stats = stats;
        self.solution = solution;
        stats
    }

    /// Getter for the independent variable's output.
    pub fn x_out(&self) -> &[f64] {
        self.solution.x_out()
    }

    /// Getter for the dependent variables' output.
    pub fn y_out(&self) -> &[V] {
        self.solution.y_out()
    }

    /// Getter for the complete output of the last integration.
    pub fn results(&self) -> &Solution<V> {
        &self.solution
    }

    /// Consumes the driver and returns the output of the last integration.
    pub fn into_results(self) -> Solution<V> {
        self.solution
    }
}

/// Integrates `f` over `x_grid` from `y0` and locates the crossings of `events`.
///
/// Pass an empty `Vec` when no events are monitored.
///
/// # Example
///
/// ```
/// use ode_events::{integrate, EventFunction, EventValue, Rk4, Vector1};
///
/// type State = Vector1<f64>;
///
/// let decay = |_x: f64, y: &State, dy: &mut State| dy[0] = -y[0];
/// let half: Box<dyn EventFunction<State>> =
///     Box::new(|_x: f64, y: &State| EventValue::new(y[0] - 0.5));
/// let grid: Vec<f64> = (0..=20).map(|i| i as f64 * 0.1).collect();
///
/// let solution = integrate(decay, Rk4::new(0.01), &grid, State::new(1.0), vec![half], 1e-6)?;
/// assert_eq!(solution.x_out().len(), 21);
/// assert!((solution.event_x()[0] - 2f64.ln()).abs() < 1e-6);
/// # Ok::<(), ode_events::IntegrationError>(())
/// ```
pub fn integrate<'a, V, F, S>(
    f: F,
    stepper: S,
    x_grid: &[f64],
    y0: V,
    events: Vec<Box<dyn EventFunction<V> + 'a>>,
    tolerance: f64,
) -> Result<Solution<V>, IntegrationError>
where
    V: Clone,
    F: System<V>,
    S: Stepper<V>,
{
    let mut driver = EventDriver::new(f, stepper, x_grid.to_vec(), y0)
        .events(events)
        .tolerance(tolerance);
    driver.integrate()?;
    Ok(driver.into_results())
}
