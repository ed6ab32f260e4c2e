//! # ODE Events
//! `ode_events` integrates ordinary differential equations over a grid supplied by the caller and
//! locates the points where user defined event functions cross zero, optionally stopping the
//! integration there.

// Re-export from external crate
use nalgebra as na;
pub use crate::na::{DMatrix, DVector, OVector, Vector1, Vector2, Vector3, Vector4, Vector5, Vector6};

// Declare modules
pub mod butcher_tableau;
pub mod constants;
pub mod controller;
pub mod deriv;
pub mod dopri5;
pub mod event;
pub mod event_driver;
pub mod ode_shared;
pub mod refine;
pub mod regress;
pub mod rk4;
pub mod solution;

pub use deriv::{deriv, DerivError, DerivMethod};
pub use dopri5::Dopri5;
pub use event::{Direction, EventFunction, EventValue};
pub use event_driver::{integrate, EventDriver};
pub use ode_shared::{IntegrationError, Stats, StepError, StepFailure, Stepper, System};
pub use refine::{Crossing, Refiner};
pub use regress::{regress, RegressError, Regression};
pub use rk4::Rk4;
pub use solution::{EventRecord, Solution};
