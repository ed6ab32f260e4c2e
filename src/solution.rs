//! Output of an integration with events.

use crate::ode_shared::Stats;
use nalgebra::DMatrix;

/// Accepted crossing of an event function.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord<V> {
    pub x: f64,
    pub y: V,
    /// Position of the event function in the registered list.
    pub index: usize,
}

/// Trajectory, event log and event values of one integration.
#[derive(Debug, Clone)]
pub struct Solution<V> {
    pub(crate) x_out: Vec<f64>,
    pub(crate) y_out: Vec<V>,
    pub(crate) events: Vec<EventRecord<V>>,
    pub(crate) event_values: DMatrix<f64>,
    pub(crate) stats: Stats,
    pub(crate) terminated: bool,
}

impl<V> Default for Solution<V> {
    fn default() -> Self {
        Solution {
            x_out: Vec::new(),
            y_out: Vec::new(),
            events: Vec::new(),
            event_values: DMatrix::zeros(0, 0),
            stats: Stats::new(),
            terminated: false,
        }
    }
}

impl<V> Solution<V> {
    /// Empty solution sized for `num_events` events over a grid of `grid_len` points.
    /// Event values not computed yet are NaN.
    pub(crate) fn with_capacity(num_events: usize, grid_len: usize) -> Self {
        Solution {
            x_out: Vec::with_capacity(grid_len),
            y_out: Vec::with_capacity(grid_len),
            events: Vec::new(),
            event_values: DMatrix::from_element(num_events, grid_len, f64::NAN),
            stats: Stats::new(),
            terminated: false,
        }
    }

    pub(crate) fn push(&mut self, x: f64, y: V) {
        self.x_out.push(x);
        self.y_out.push(y);
    }

    /// Replaces the last sample of the trajectory.
    pub(crate) fn replace_last(&mut self, x: f64, y: V) {
        self.x_out.pop();
        self.y_out.pop();
        self.push(x, y);
    }

    /// Getter for the independent variable's output.
    pub fn x_out(&self) -> &[f64] {
        &self.x_out
    }

    /// Getter for the dependent variables' output.
    pub fn y_out(&self) -> &[V] {
        &self.y_out
    }

    /// Returns the trajectory as a pair of slices.
    pub fn get(&self) -> (&[f64], &[V]) {
        (&self.x_out, &self.y_out)
    }

    /// Accepted events in detection order.
    pub fn events(&self) -> &[EventRecord<V>] {
        &self.events
    }

    /// Locations of the accepted events.
    pub fn event_x(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.x).collect()
    }

    /// States at the accepted events.
    pub fn event_y(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.events.iter().map(|e| e.y.clone()).collect()
    }

    /// Index of the event function behind each accepted event.
    pub fn event_index(&self) -> Vec<usize> {
        self.events.iter().map(|e| e.index).collect()
    }

    /// Event values on the grid, one row per event function and one column per grid point.
    pub fn event_values(&self) -> &DMatrix<f64> {
        &self.event_values
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Returns true if the integration stopped on a terminal event.
    pub fn terminated(&self) -> bool {
        self.terminated
    }
}
