use approx::assert_relative_eq;
use ode_events::{
    integrate, Direction, Dopri5, EventDriver, EventFunction, EventValue, IntegrationError, Rk4,
    StepError, StepFailure, Stats, Stepper, System, Vector1, Vector2,
};
use std::f64::consts::PI;

const TOLERANCE: f64 = 1e-6;

type State = Vector1<f64>;

fn decay(_x: f64, y: &State, dy: &mut State) {
    dy[0] = -y[0];
}

fn oscillator(_x: f64, y: &Vector2<f64>, dy: &mut Vector2<f64>) {
    dy[0] = y[1];
    dy[1] = -y[0];
}

fn grid(n: usize, dx: f64) -> Vec<f64> {
    (0..=n).map(|i| i as f64 * dx).collect()
}

fn boxed<V, E>(event: E) -> Box<dyn EventFunction<V>>
where
    E: EventFunction<V> + 'static,
{
    Box::new(event)
}

fn half_life(terminal: bool) -> Box<dyn EventFunction<State>> {
    boxed(move |_x: f64, y: &State| EventValue::new(y[0] - 0.5).terminal(terminal))
}

#[test]
fn non_terminal_event_is_recorded_and_integration_continues() {
    let x_grid = grid(20, 0.1);
    let solution = integrate(
        decay,
        Rk4::new(0.01),
        &x_grid,
        State::new(1.0),
        vec![half_life(false)],
        TOLERANCE,
    )
    .unwrap();

    assert_eq!(solution.events().len(), 1);
    assert_eq!(solution.event_index(), vec![0]);
    assert!((solution.event_x()[0] - 2.0_f64.ln()).abs() < TOLERANCE);
    assert!((solution.event_y()[0][0] - 0.5).abs() < TOLERANCE);

    assert_eq!(solution.x_out(), &x_grid[..]);
    assert_eq!(solution.y_out().len(), x_grid.len());
    assert_relative_eq!(solution.y_out()[20][0], (-2.0_f64).exp(), epsilon = 1e-9);
    assert!(!solution.terminated());
}

#[test]
fn terminal_event_truncates_the_trajectory() {
    let x_grid = grid(20, 0.1);
    let solution = integrate(
        decay,
        Rk4::new(0.01),
        &x_grid,
        State::new(1.0),
        vec![half_life(true)],
        TOLERANCE,
    )
    .unwrap();

    let (x_out, y_out) = solution.get();
    // Samples at 0.0, ..., 0.6 followed by the event.
    assert_eq!(x_out.len(), 8);
    assert_eq!(y_out.len(), 8);
    let x_last = *x_out.last().unwrap();
    assert!((x_last - 2.0_f64.ln()).abs() < TOLERANCE);
    assert_eq!(x_last, solution.event_x()[0]);
    assert_eq!(y_out.last(), solution.event_y().last());
    assert!(solution.terminated());

    // Columns past the terminal step were never evaluated.
    let values = solution.event_values();
    assert!(!values[(0, 7)].is_nan());
    assert!(values[(0, 8)].is_nan());
}

fn sine_crossings(direction: Direction) -> Vec<f64> {
    let event = move |_x: f64, y: &Vector2<f64>| EventValue::new(y[0]).direction(direction);
    let mut driver = EventDriver::new(
        oscillator,
        Rk4::new(0.01),
        grid(100, 0.1),
        Vector2::new(0.0, 1.0),
    )
    .event(event)
    .tolerance(TOLERANCE);
    driver.integrate().unwrap();
    assert_eq!(driver.x_out().len(), 101);
    driver.results().event_x()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < TOLERANCE, "{} vs {}", a, e);
    }
}

#[test]
fn direction_filter_selects_crossings() {
    // sin(x) on [0, 10]: falls through zero at pi and 3 pi, rises at 2 pi.
    assert_close(&sine_crossings(Direction::Any), &[PI, 2.0 * PI, 3.0 * PI]);
    assert_close(&sine_crossings(Direction::Increasing), &[2.0 * PI]);
    assert_close(&sine_crossings(Direction::Decreasing), &[PI, 3.0 * PI]);
}

#[test]
fn repeated_calls_give_identical_results() {
    let run = || {
        integrate(
            decay,
            Rk4::new(0.01),
            &grid(20, 0.1),
            State::new(1.0),
            vec![half_life(false)],
            TOLERANCE,
        )
        .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.x_out(), second.x_out());
    assert_eq!(first.y_out(), second.y_out());
    assert_eq!(first.events(), second.events());
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn driver_can_be_run_twice() {
    let mut driver = EventDriver::new(decay, Rk4::new(0.01), grid(20, 0.1), State::new(1.0))
        .events(vec![half_life(false)]);
    let first_stats = driver.integrate().unwrap();
    let first = driver.results().clone();
    let second_stats = driver.integrate().unwrap();
    assert_eq!(first_stats, second_stats);
    assert_eq!(first.x_out(), driver.x_out());
    assert_eq!(first.y_out(), driver.y_out());
    assert_eq!(first.events(), driver.results().events());
}

#[test]
fn two_point_grid_without_crossing() {
    let event = |_x: f64, y: &State| EventValue::new(y[0] - 10.0);
    let solution = integrate(
        decay,
        Rk4::new(0.01),
        &[0.0, 0.1],
        State::new(1.0),
        vec![boxed(event)],
        TOLERANCE,
    )
    .unwrap();
    assert!(solution.events().is_empty());
    assert_eq!(solution.x_out(), &[0.0, 0.1]);
    assert_eq!(solution.y_out().len(), 2);
    assert_eq!(solution.stats().event_evals, 2);
    assert_eq!(solution.stats().refine_iterations, 0);
}

#[test]
fn no_events_is_valid() {
    let solution = integrate(
        decay,
        Rk4::new(0.01),
        &grid(5, 0.2),
        State::new(1.0),
        Vec::new(),
        TOLERANCE,
    )
    .unwrap();
    assert!(solution.events().is_empty());
    assert_eq!(solution.x_out().len(), 6);
    assert_eq!(solution.event_values().nrows(), 0);
}

#[test]
fn invalid_arguments_fail_before_stepping() {
    let run = |x_grid: &[f64], tolerance: f64| {
        integrate(
            decay,
            Rk4::new(0.01),
            x_grid,
            State::new(1.0),
            vec![half_life(false)],
            tolerance,
        )
        .err()
    };
    assert_eq!(
        run(&[0.0], TOLERANCE),
        Some(IntegrationError::GridTooShort { len: 1 })
    );
    assert_eq!(
        run(&[], TOLERANCE),
        Some(IntegrationError::GridTooShort { len: 0 })
    );
    assert_eq!(
        run(&[0.0, 0.2, 0.1], TOLERANCE),
        Some(IntegrationError::NonMonotonicGrid { index: 2 })
    );
    assert_eq!(
        run(&[0.0, 0.1, 0.1], TOLERANCE),
        Some(IntegrationError::NonMonotonicGrid { index: 2 })
    );
    assert_eq!(
        run(&[0.0, f64::NAN], TOLERANCE),
        Some(IntegrationError::NonFiniteGrid { index: 1 })
    );
    assert_eq!(
        run(&[0.0, 1.0], 0.0),
        Some(IntegrationError::InvalidTolerance { tolerance: 0.0 })
    );
}

#[test]
fn exact_zero_on_the_grid_is_not_a_crossing() {
    let event = |x: f64, _y: &State| EventValue::new(x - 0.5);
    let solution = integrate(
        decay,
        Rk4::new(0.01),
        &[0.0, 0.25, 0.5, 0.75, 1.0],
        State::new(1.0),
        vec![boxed(event)],
        TOLERANCE,
    )
    .unwrap();
    assert!(solution.events().is_empty());
    assert_eq!(solution.event_values()[(0, 2)], 0.0);
}

#[test]
fn events_in_one_step_are_processed_in_registration_order() {
    let late = |x: f64, _y: &State| EventValue::new(x - 0.55);
    let early = |x: f64, _y: &State| EventValue::new(x - 0.52);
    let solution = integrate(
        decay,
        Rk4::new(0.01),
        &grid(10, 0.1),
        State::new(1.0),
        vec![boxed(late), boxed(early)],
        TOLERANCE,
    )
    .unwrap();
    assert_eq!(solution.event_index(), vec![0, 1]);
    assert_close(&solution.event_x(), &[0.55, 0.52]);
}

#[test]
fn terminal_event_skips_the_remaining_events_of_its_step() {
    let stop = |x: f64, _y: &State| EventValue::new(x - 0.55).terminal(true);
    let later = |x: f64, _y: &State| EventValue::new(x - 0.52);
    let solution = integrate(
        decay,
        Rk4::new(0.01),
        &grid(10, 0.1),
        State::new(1.0),
        vec![boxed(stop), boxed(later)],
        TOLERANCE,
    )
    .unwrap();
    assert_eq!(solution.event_index(), vec![0]);
    assert!((solution.x_out().last().unwrap() - 0.55).abs() < TOLERANCE);
    assert_eq!(solution.x_out().len(), 7);
}

#[test]
fn rejected_crossing_does_not_stop_integration() {
    let event = |_x: f64, y: &State| {
        EventValue::new(y[0] - 0.5)
            .terminal(true)
            .direction(Direction::Increasing)
    };
    let solution = integrate(
        decay,
        Rk4::new(0.01),
        &grid(20, 0.1),
        State::new(1.0),
        vec![boxed(event)],
        TOLERANCE,
    )
    .unwrap();
    assert!(solution.events().is_empty());
    assert_eq!(solution.x_out().len(), 21);
    assert!(solution.stats().refine_iterations > 0);
}

fn ramp(_x: f64, _y: &State, dy: &mut State) {
    dy[0] = 1.0;
}

#[test]
fn terminal_curved_event_on_a_coarse_grid() {
    let root: f64 = 0.3;
    let event =
        move |_x: f64, y: &State| EventValue::new(y[0].powi(4) - root.powi(4)).terminal(true);
    let solution = integrate(
        ramp,
        Rk4::new(0.01),
        &[0.0, 1.0, 2.0],
        State::new(0.0),
        vec![boxed(event)],
        TOLERANCE,
    )
    .unwrap();
    assert!(solution.terminated());
    assert_eq!(solution.x_out().len(), 2);
    assert_eq!(solution.x_out()[0], 0.0);
    assert!((solution.x_out()[1] - root).abs() < TOLERANCE);
    assert!((solution.event_x()[0] - root).abs() < TOLERANCE);
    assert!((solution.y_out()[1][0] - root).abs() < TOLERANCE);
    assert!(solution.stats().refine_iterations < 100);
}

#[test]
fn curved_events_are_located_within_tolerance_of_the_root() {
    for &power in &[2, 3, 8, 20] {
        for &root in &[0.05_f64, 0.3, 0.95] {
            let event =
                move |_x: f64, y: &State| EventValue::new(y[0].powi(power) - root.powi(power));
            let solution = integrate(
                ramp,
                Rk4::new(0.01),
                &[0.0, 1.0, 2.0],
                State::new(0.0),
                vec![boxed(event)],
                TOLERANCE,
            )
            .unwrap();
            assert_eq!(solution.events().len(), 1);
            let x = solution.event_x()[0];
            assert!(
                (x - root).abs() < TOLERANCE,
                "power {} root {}: x = {}",
                power,
                root,
                x
            );
        }
    }
}

/// Exact stepper for dy/dx = 1 that reports a failure on every call.
struct Unreliable {
    calls: u32,
}

impl Stepper<f64> for Unreliable {
    fn step<F: System<f64>>(
        &mut self,
        _f: &F,
        x: f64,
        y: &f64,
        x_end: f64,
    ) -> Result<f64, StepFailure<f64>> {
        self.calls += 1;
        Err(StepFailure {
            x: x_end,
            y: y + (x_end - x),
            error: StepError::StepSizeUnderflow { x },
        })
    }

    fn stats(&self) -> Stats {
        Stats {
            accepted_steps: self.calls,
            ..Stats::default()
        }
    }

    fn reset_stats(&mut self) {
        self.calls = 0;
    }
}

#[test]
fn stepper_failures_are_not_fatal() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_test_writer()
        .try_init();

    let rhs = |_x: f64, _y: &f64, dy: &mut f64| *dy = 1.0;
    let event = |_x: f64, y: &f64| EventValue::new(y - 0.35);
    let mut driver = EventDriver::new(rhs, Unreliable { calls: 0 }, grid(10, 0.1), 0.0)
        .event(event)
        .tolerance(1e-9);
    let stats = driver.integrate().unwrap();

    assert_eq!(driver.x_out().len(), 11);
    assert!((driver.y_out()[10] - 1.0).abs() < 1e-12);
    let events = driver.results().events();
    assert_eq!(events.len(), 1);
    assert!((events[0].x - 0.35).abs() < 1e-9);
    assert!(stats.accepted_steps > 10);
}

#[test]
fn adaptive_stepper_finds_ground_impact() {
    const G: f64 = 9.81;
    let fall = |_t: f64, y: &Vector2<f64>, dy: &mut Vector2<f64>| {
        dy[0] = y[1];
        dy[1] = -G;
    };
    let ground = |_t: f64, y: &Vector2<f64>| {
        EventValue::new(y[0])
            .terminal(true)
            .direction(Direction::Decreasing)
    };
    let solution = integrate(
        fall,
        Dopri5::new(1e-10, 1e-10),
        &grid(30, 0.1),
        Vector2::new(10.0, 0.0),
        vec![boxed(ground)],
        1e-9,
    )
    .unwrap();

    let impact = (2.0 * 10.0 / G).sqrt();
    assert!(solution.terminated());
    assert!((solution.x_out().last().unwrap() - impact).abs() < 1e-8);
    assert_relative_eq!(solution.event_y()[0][1], -G * impact, epsilon = 1e-6);
    assert!(solution.stats().num_eval > 0);
}
