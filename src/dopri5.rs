//! Explicit Runge-Kutta method with Dormand-Prince coefficients of order 5(4) and adaptive step size.

use crate::butcher_tableau::dopri54;
use crate::constants::{initial_step, stiffness};
use crate::controller::{Controller, StepDecision};
use crate::ode_shared::{StepError, StepFailure, Stats, Stepper, System};

use nalgebra::{allocator::Allocator, storage::Storage, DefaultAllocator, Dim, OVector, Scalar};
use num_traits::Zero;
use simba::scalar::{ClosedAdd, ClosedMul, ClosedSub};

/// Adaptive stepper. The grid interval handed to [`Stepper::step`] is covered with as many
/// internal steps as the tolerances require.
#[derive(Debug, Clone)]
pub struct Dopri5 {
    rtol: f64,
    atol: f64,
    uround: f64,
    h_init: f64,
    n_max: u32,
    n_stiff: u32,
    controller: Controller,
    stats: Stats,
}

impl Dopri5 {
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `rtol`    - Relative tolerance used in the computation of the adaptive step size
    /// * `atol`    - Absolute tolerance used in the computation of the adaptive step size
    ///
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self::from_param(rtol, atol, 0.9, 0.04, 0.2, 10.0, f64::INFINITY, 0.0, 100000, 1000)
    }

    /// Advanced initializer for the structure.
    ///
    /// # Arguments
    ///
    /// * `rtol`    - Relative tolerance used in the computation of the adaptive step size
    /// * `atol`    - Absolute tolerance used in the computation of the adaptive step size
    /// * `safety_factor`   - Safety factor used in the computation of the adaptive step size
    /// * `beta`    - Value of the beta coefficient of the PI controller. Default is 0.04
    /// * `fac_min` - Minimum factor between two successive steps. Default is 0.2
    /// * `fac_max` - Maximum factor between two successive steps. Default is 10.0
    /// * `h_max`   - Maximum step size. Default is the length of each requested interval
    /// * `h`       - Initial value of the step size. If h = 0.0, the intial value of h is computed automatically
    /// * `n_max`   - Maximum number of steps per requested interval. Default is 100000
    /// * `n_stiff` - Stifness is tested when the number of accepted steps is a multiple of n_stiff. Default is 1000
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn from_param(
        rtol: f64,
        atol: f64,
        safety_factor: f64,
        beta: f64,
        fac_min: f64,
        fac_max: f64,
        h_max: f64,
        h: f64,
        n_max: u32,
        n_stiff: u32,
    ) -> Self {
        Self {
            rtol,
            atol,
            uround: f64::EPSILON,
            h_init: h.abs(),
            n_max,
            n_stiff: n_stiff.max(1),
            controller: Controller::new(beta, fac_max, fac_min, h_max, safety_factor),
            stats: Stats::new(),
        }
    }

    /// Compute the initial stepsize
    fn hinit<T, D, F>(&self, f: &F, x: f64, y: &OVector<T, D>, f0: &OVector<T, D>, h_max: f64) -> f64
    where
        f64: From<T>,
        T: Copy + Scalar + ClosedAdd + ClosedMul + Zero,
        D: Dim,
        F: System<OVector<T, D>>,
        OVector<T, D>: std::ops::Mul<f64, Output = OVector<T, D>>,
        DefaultAllocator: Allocator<T, D>,
    {
        let (rows, cols) = y.data.shape();

        // Compute the norm of y0 and f0
        let dim = rows.value();
        let mut d0 = 0.0;
        let mut d1 = 0.0;
        for i in 0..dim {
            let y_i = f64::from(y[i]);
            let sci = self.atol + y_i.abs() * self.rtol;
            d0 += (y_i / sci) * (y_i / sci);
            let f0_i = f64::from(f0[i]);
            d1 += (f0_i / sci) * (f0_i / sci);
        }

        // Compute h0
        let h0 = if d0 < initial_step::MIN_NORM || d1 < initial_step::MIN_NORM {
            initial_step::DEFAULT_INITIAL_STEP
        } else {
            initial_step::SAFETY_FACTOR * (d0 / d1).sqrt()
        };
        let h0 = h0.min(h_max);

        let y1 = y + f0.clone() * h0;
        let mut f1 = OVector::zeros_generic(rows, cols);
        f.system(x + h0, &y1, &mut f1);

        // Compute the norm of f1-f0 divided by h0
        let mut d2: f64 = 0.0;
        for i in 0..dim {
            let f0_i = f64::from(f0[i]);
            let f1_i = f64::from(f1[i]);
            let y_i = f64::from(y[i]);
            let sci: f64 = self.atol + y_i.abs() * self.rtol;
            d2 += ((f1_i - f0_i) / sci) * ((f1_i - f0_i) / sci);
        }
        d2 = d2.sqrt() / h0;

        let h1 = if d1.sqrt().max(d2.abs()) <= 1.0E-15 {
            (1.0E-6_f64).max(h0 * 1.0E-3)
        } else {
            (0.01 / (d1.sqrt().max(d2))).powf(1.0 / 5.0)
        };

        (100.0 * h0).min(h1.min(h_max))
    }
}

impl<T, D> Stepper<OVector<T, D>> for Dopri5
where
    f64: From<T>,
    T: Copy + Scalar + ClosedAdd + ClosedMul + ClosedSub + Zero,
    D: Dim,
    OVector<T, D>: std::ops::Mul<f64, Output = OVector<T, D>>,
    DefaultAllocator: Allocator<T, D>,
{
    fn step<F: System<OVector<T, D>>>(
        &mut self,
        f: &F,
        x_start: f64,
        y_start: &OVector<T, D>,
        x_end: f64,
    ) -> Result<OVector<T, D>, StepFailure<OVector<T, D>>> {
        let span = x_end - x_start;
        if span == 0.0 {
            return Ok(y_start.clone());
        }

        // Initilization
        let (rows, cols) = y_start.data.shape();
        let dim = rows.value();
        let mut x = x_start;
        let mut y = y_start.clone();
        let mut n_step = 0;
        let mut non_stiff = 0;
        let mut iasti = 0;
        let mut last = false;
        let mut controller = self.controller.clone();
        controller.reset();
        controller.limit_h_max(span);
        let h_max = controller.h_max();

        let mut k = vec![OVector::zeros_generic(rows, cols); 7];
        f.system(x, &y, &mut k[0]);
        self.stats.num_eval += 1;

        let mut h = if self.h_init == 0.0 {
            self.stats.num_eval += 1;
            self.hinit(f, x, &y, &k[0], h_max)
        } else {
            self.h_init.min(h_max)
        };

        // Main loop
        while !last {
            // Check if step number is within allowed range
            if n_step > self.n_max {
                return Err(StepFailure {
                    x,
                    y,
                    error: StepError::MaxNumStepReached { x, n_step },
                });
            }

            // Check for step size underflow
            if 0.1 * h.abs() <= self.uround * x.abs() {
                return Err(StepFailure {
                    x,
                    y,
                    error: StepError::StepSizeUnderflow { x },
                });
            }

            // Check if it's the last iteration
            if x + 1.01 * h - x_end > 0.0 {
                h = x_end - x;
                last = true;
            }
            n_step += 1;

            // 6 Stages
            let mut y_next = OVector::zeros_generic(rows, cols);
            let mut y_stiff = OVector::zeros_generic(rows, cols);
            for s in 1..7 {
                y_next = y.clone();
                for (j, k_value) in k.iter().enumerate().take(s) {
                    y_next += k_value.clone() * (h * dopri54::a(s + 1, j + 1));
                }
                f.system(x + h * dopri54::c(s + 1), &y_next, &mut k[s]);
                if s == 5 {
                    y_stiff = y_next.clone();
                }
            }
            k[1] = k[6].clone();
            self.stats.num_eval += 6;

            // Compute error estimate
            let err_est = (k[0].clone() * dopri54::e(1)
                + k[2].clone() * dopri54::e(3)
                + k[3].clone() * dopri54::e(4)
                + k[4].clone() * dopri54::e(5)
                + k[5].clone() * dopri54::e(6)
                + k[1].clone() * dopri54::e(7))
                * h;

            // Compute error
            let mut err = 0.0;
            for i in 0..dim {
                let y_i = f64::from(y[i]);
                let y_next_i = f64::from(y_next[i]);
                let sc_i: f64 = self.atol + y_i.abs().max(y_next_i.abs()) * self.rtol;
                let err_est_i = f64::from(err_est[i]);
                err += (err_est_i / sc_i) * (err_est_i / sc_i);
            }
            err = (err / dim as f64).sqrt();

            if !err.is_finite() {
                return Err(StepFailure {
                    x,
                    y,
                    error: StepError::NonFiniteState { x: x + h },
                });
            }

            // Step size control
            match controller.decide(err, h) {
                StepDecision::Accept(h_new) => {
                    self.stats.accepted_steps += 1;

                    // Stifness detection
                    if self.stats.accepted_steps % self.n_stiff == 0 || iasti > 0 {
                        let dk = &k[1] - &k[5];
                        let dy = &y_next - &y_stiff;
                        let num = f64::from(dk.dot(&dk));
                        let den = f64::from(dy.dot(&dy));
                        let h_lamb = if den > 0.0 { h * (num / den).sqrt() } else { 0.0 };

                        if h_lamb > stiffness::DOPRI5_THRESHOLD {
                            iasti += 1;
                            non_stiff = 0;
                            if iasti == stiffness::MAX_STIFF_ITERATIONS {
                                return Err(StepFailure {
                                    x,
                                    y,
                                    error: StepError::StiffnessDetected { x },
                                });
                            }
                        } else {
                            non_stiff += 1;
                            if non_stiff == stiffness::NON_STIFF_RESET_COUNT {
                                iasti = 0;
                            }
                        }
                    }

                    k[0] = k[1].clone();
                    y = y_next;
                    x = if last { x_end } else { x + h };
                    h = h_new;
                }
                StepDecision::Reject(h_new) => {
                    last = false;
                    if self.stats.accepted_steps >= 1 {
                        self.stats.rejected_steps += 1;
                    }
                    h = h_new;
                }
            }
        }
        Ok(y)
    }

    fn stats(&self) -> Stats {
        self.stats
    }

    fn reset_stats(&mut self) {
        self.stats = Stats::new();
    }
}
