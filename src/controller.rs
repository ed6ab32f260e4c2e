//! Adaptive step size control.

/// Outcome of the error test on a trial step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepDecision {
    /// The step is accepted; continue with the given step size.
    Accept(f64),
    /// The step is rejected; retry with the given step size.
    Reject(f64),
}

/// PI controller used by the adaptive stepper
#[derive(Debug, Clone)]
pub struct Controller {
    alpha: f64,
    beta: f64,
    facc1: f64,
    facc2: f64,
    fac_old: f64,
    h_max: f64,
    reject: bool,
    safety_factor: f64,
}

impl Controller {
    /// Creates a controller responsible for adaptive step size control.
    ///
    /// # Arguments
    ///
    /// * `beta`    - &#946; coefficient of the PI controller, &#945; is derived from it
    /// * `fac_max` - Maximum factor between two successive steps
    /// * `fac_min` - Minimum factor between two successive steps
    /// * `h_max`   - Maximum step size
    /// * `safety_factor`   - Safety factor of the PI controller
    ///
    pub fn new(beta: f64, fac_max: f64, fac_min: f64, h_max: f64, safety_factor: f64) -> Self {
        Controller {
            alpha: 0.2 - beta * 0.75,
            beta,
            facc1: 1.0 / fac_min,
            facc2: 1.0 / fac_max,
            fac_old: 1.0E-4,
            h_max: h_max.abs(),
            reject: false,
            safety_factor,
        }
    }

    /// Forgets the history of previous steps.
    pub fn reset(&mut self) {
        self.fac_old = 1.0E-4;
        self.reject = false;
    }

    /// Decides on a step of size `h` with scaled error `err` and proposes the next step size.
    pub fn decide(&mut self, err: f64, h: f64) -> StepDecision {
        let fac11 = err.powf(self.alpha);
        let fac = fac11 * self.fac_old.powf(-self.beta);
        let fac = self.facc2.max(self.facc1.min(fac / self.safety_factor));

        if err <= 1.0 {
            self.fac_old = err.max(1.0E-4);
            let mut h_new = (h / fac).min(self.h_max);
            if self.reject {
                h_new = h_new.min(h);
            }
            self.reject = false;
            StepDecision::Accept(h_new)
        } else {
            self.reject = true;
            StepDecision::Reject(h / self.facc1.min(fac11 / self.safety_factor))
        }
    }

    /// Returns the maximum step size allowed.
    pub fn h_max(&self) -> f64 {
        self.h_max
    }

    /// Caps the step size at `h_max`, used when the interval is shorter than the configured cap.
    pub fn limit_h_max(&mut self, h_max: f64) {
        self.h_max = self.h_max.min(h_max.abs());
    }
}
