//! Explicit Runge-Kutta method of order 4 with fixed step size.

use crate::ode_shared::{StepError, StepFailure, Stats, Stepper, System};

use nalgebra::{allocator::Allocator, storage::Storage, DefaultAllocator, Dim, OVector, Scalar};
use num_traits::Zero;
use simba::scalar::{ClosedAdd, ClosedMul};

/// Fixed step stepper. Each requested interval is split into the smallest number of
/// equal sub-steps that do not exceed `step_size`.
#[derive(Debug, Clone)]
pub struct Rk4 {
    step_size: f64,
    stats: Stats,
}

impl Rk4 {
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `step_size`   - Largest step size used in the method
    ///
    pub fn new(step_size: f64) -> Self {
        Rk4 {
            step_size: step_size.abs(),
            stats: Stats::new(),
        }
    }

    /// Number of sub-steps used to cover an interval of length `span`.
    fn num_steps(&self, span: f64) -> usize {
        // Rounding in the grid values must not add a sub-step.
        let n = (span.abs() / self.step_size - 1.0e-9).ceil();
        if n.is_finite() && n >= 1.0 {
            n as usize
        } else {
            1
        }
    }

    /// Performs one step of the Runge-Kutta 4 method.
    fn rk4_step<T, D, F>(&self, f: &F, x: f64, y: &OVector<T, D>, h: f64) -> OVector<T, D>
    where
        T: Copy + Scalar + ClosedAdd + ClosedMul + Zero,
        D: Dim,
        F: System<OVector<T, D>>,
        OVector<T, D>: std::ops::Mul<f64, Output = OVector<T, D>>,
        DefaultAllocator: Allocator<T, D>,
    {
        let half_step = h / 2.;
        let (rows, cols) = y.data.shape();
        let mut k = vec![OVector::zeros_generic(rows, cols); 4];

        f.system(x, y, &mut k[0]);
        f.system(
            x + half_step,
            &(y.clone() + k[0].clone() * half_step),
            &mut k[1],
        );
        f.system(
            x + half_step,
            &(y.clone() + k[1].clone() * half_step),
            &mut k[2],
        );
        f.system(x + h, &(y.clone() + k[2].clone() * h), &mut k[3]);

        y + (k[0].clone() + k[1].clone() * 2.0 + k[2].clone() * 2.0 + k[3].clone()) * (h / 6.0)
    }
}

impl<T, D> Stepper<OVector<T, D>> for Rk4
where
    f64: From<T>,
    T: Copy + Scalar + ClosedAdd + ClosedMul + Zero,
    D: Dim,
    OVector<T, D>: std::ops::Mul<f64, Output = OVector<T, D>>,
    DefaultAllocator: Allocator<T, D>,
{
    fn step<S: System<OVector<T, D>>>(
        &mut self,
        f: &S,
        x: f64,
        y: &OVector<T, D>,
        x_end: f64,
    ) -> Result<OVector<T, D>, StepFailure<OVector<T, D>>> {
        let num_steps = self.num_steps(x_end - x);
        let h = (x_end - x) / num_steps as f64;

        let mut x_cur = x;
        let mut y_cur = y.clone();
        for i in 0..num_steps {
            let y_new = self.rk4_step(f, x_cur, &y_cur, h);
            self.stats.num_eval += 4;
            self.stats.accepted_steps += 1;

            // Land exactly on the requested end point.
            let x_new = if i + 1 == num_steps { x_end } else { x_cur + h };
            if !y_new.iter().all(|v| f64::from(*v).is_finite()) {
                return Err(StepFailure {
                    x: x_new,
                    y: y_new,
                    error: StepError::NonFiniteState { x: x_new },
                });
            }
            x_cur = x_new;
            y_cur = y_new;
        }
        Ok(y_cur)
    }

    fn stats(&self) -> Stats {
        self.stats
    }

    fn reset_stats(&mut self) {
        self.stats = Stats::new();
    }
}
