//! Event functions monitored during the integration.
//!
//! An event function maps `(x, y)` to a scalar [`EventValue`]. The driver looks for
//! the points where that value changes sign between two grid points and locates
//! them with the [`Refiner`](crate::refine::Refiner).

use std::convert::TryFrom;
use std::fmt;

/// Which zero crossings of an event function are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Only crossings where the value decreases through zero.
    Decreasing,
    /// Every crossing.
    Any,
    /// Only crossings where the value increases through zero.
    Increasing,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Any
    }
}

impl Direction {
    /// Returns true if a crossing from `before` to `after` passes this filter.
    pub fn accepts(self, before: f64, after: f64) -> bool {
        match self {
            Direction::Any => true,
            Direction::Increasing => after > before,
            Direction::Decreasing => after < before,
        }
    }
}

/// Error returned when converting an integer other than -1, 0 or 1 into a [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("direction must be -1, 0 or 1, got {0}")]
pub struct InvalidDirection(pub i32);

impl TryFrom<i32> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Direction::Decreasing),
            0 => Ok(Direction::Any),
            1 => Ok(Direction::Increasing),
            other => Err(InvalidDirection(other)),
        }
    }
}

impl From<Direction> for i32 {
    fn from(direction: Direction) -> i32 {
        match direction {
            Direction::Decreasing => -1,
            Direction::Any => 0,
            Direction::Increasing => 1,
        }
    }
}

/// Output of an event function at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventValue {
    pub value: f64,
    /// Stop the integration when this event is accepted.
    pub terminal: bool,
    pub direction: Direction,
}

impl EventValue {
    /// Non-terminal value reporting crossings in both directions.
    pub fn new(value: f64) -> Self {
        EventValue {
            value,
            terminal: false,
            direction: Direction::Any,
        }
    }

    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (terminal: {}, direction: {})",
            self.value,
            self.terminal,
            i32::from(self.direction)
        )
    }
}

/// Trait implemented by event functions.
///
/// Closures with the signature `Fn(f64, &V) -> EventValue` implement it.
///
/// # Example
///
/// ```
/// use ode_events::{Direction, EventFunction, EventValue, Vector1};
///
/// // Fires once, when y[0] falls through 0.5.
/// let half_life = |_x: f64, y: &Vector1<f64>| {
///     EventValue::new(y[0] - 0.5)
///         .terminal(true)
///         .direction(Direction::Decreasing)
/// };
/// assert_eq!(half_life.evaluate(0.0, &Vector1::new(1.0)).value, 0.5);
/// ```
pub trait EventFunction<V> {
    /// Evaluates the event function. Must not have side effects.
    fn evaluate(&self, x: f64, y: &V) -> EventValue;
}

impl<V, F> EventFunction<V> for F
where
    F: Fn(f64, &V) -> EventValue,
{
    fn evaluate(&self, x: f64, y: &V) -> EventValue {
        self(x, y)
    }
}

/// Returns true if the event value changed sign between two consecutive points.
///
/// An exact zero at either point is not a crossing.
pub fn sign_changed(before: f64, after: f64) -> bool {
    before * after < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips_through_integers() {
        for value in -1..=1 {
            let direction = Direction::try_from(value).unwrap();
            assert_eq!(i32::from(direction), value);
        }
        assert_eq!(Direction::try_from(2), Err(InvalidDirection(2)));
    }

    #[test]
    fn direction_filter() {
        assert!(Direction::Any.accepts(1.0, -1.0));
        assert!(Direction::Any.accepts(-1.0, 1.0));
        assert!(Direction::Increasing.accepts(-1.0, 1.0));
        assert!(!Direction::Increasing.accepts(1.0, -1.0));
        assert!(Direction::Decreasing.accepts(1.0, -1.0));
        assert!(!Direction::Decreasing.accepts(-1.0, 1.0));
    }

    #[test]
    fn exact_zero_is_not_a_sign_change() {
        assert!(sign_changed(-1.0, 2.0));
        assert!(sign_changed(3.0, -0.5));
        assert!(!sign_changed(0.0, 1.0));
        assert!(!sign_changed(-1.0, 0.0));
        assert!(!sign_changed(1.0, 2.0));
        assert!(!sign_changed(f64::NAN, -1.0));
    }

    #[test]
    fn builder_defaults() {
        let value = EventValue::new(0.25);
        assert!(!value.terminal);
        assert_eq!(value.direction, Direction::Any);
        let value = value.terminal(true).direction(Direction::Increasing);
        assert!(value.terminal);
        assert_eq!(value.to_string(), "0.25 (terminal: true, direction: 1)");
    }
}
