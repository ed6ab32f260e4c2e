//! Numerical derivatives of sampled data.

use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;
use thiserror::Error;

/// Method used by [`deriv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivMethod {
    /// Centered differences, one-sided differences at the end points. Needs 2 points.
    TwoPoint,
    /// Fourth order centered differences on a uniform grid. Needs 5 points.
    FourPoint,
    /// Differentiation in Fourier space of periodic, uniformly spaced samples.
    ///
    /// The period is `N * h` with `h = x[1] - x[0]`, whatever the grid origin: the samples
    /// span one period without repeating the first point at the end. Grids that include the
    /// end point of the period, or use `x[N - 1]` as the period, are not supported. Odd `N`
    /// uses the wavenumbers `0, 1, .., (N - 1) / 2, -(N - 1) / 2, .., -1`; for even `N` the
    /// Nyquist mode is dropped.
    Spectral,
}

impl Default for DerivMethod {
    fn default() -> Self {
        DerivMethod::TwoPoint
    }
}

/// Enumeration of the errors that may arise while differentiating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DerivError {
    #[error("x and y must have the same length, got {x_len} and {y_len}.")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("The method needs at least {needed} points, got {len}.")]
    TooFewPoints { needed: usize, len: usize },
    #[error("Two consecutive x values are equal at index {index}.")]
    DegenerateSpacing { index: usize },
}

/// Computes dy/dx from samples `y` taken at `x`.
pub fn deriv(x: &[f64], y: &[f64], method: DerivMethod) -> Result<Vec<f64>, DerivError> {
    if x.len() != y.len() {
        return Err(DerivError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    let needed = match method {
        DerivMethod::TwoPoint | DerivMethod::Spectral => 2,
        DerivMethod::FourPoint => 5,
    };
    if x.len() < needed {
        return Err(DerivError::TooFewPoints {
            needed,
            len: x.len(),
        });
    }
    if let Some(index) = x.windows(2).position(|w| w[1] == w[0]) {
        return Err(DerivError::DegenerateSpacing { index: index + 1 });
    }

    Ok(match method {
        DerivMethod::TwoPoint => two_point(x, y),
        DerivMethod::FourPoint => four_point(x, y),
        DerivMethod::Spectral => spectral(x, y),
    })
}

fn forward(x: &[f64], y: &[f64], i: usize) -> f64 {
    (y[i + 1] - y[i]) / (x[i + 1] - x[i])
}

fn two_point(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut dydx = vec![0.0; n];
    for i in 1..n - 1 {
        dydx[i] = (y[i + 1] - y[i - 1]) / (x[i + 1] - x[i - 1]);
    }
    dydx[0] = forward(x, y, 0);
    dydx[n - 1] = forward(x, y, n - 2);
    dydx
}

fn four_point(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    // Assumes uniform spacing.
    let h = x[1] - x[0];
    let mut dydx = vec![0.0; n];
    for i in 2..n - 2 {
        dydx[i] = (y[i - 2] - 8.0 * y[i - 1] + 8.0 * y[i + 1] - y[i + 2]) / (12.0 * h);
    }
    dydx[0] = forward(x, y, 0);
    dydx[1] = forward(x, y, 1);
    dydx[n - 2] = forward(x, y, n - 3);
    dydx[n - 1] = forward(x, y, n - 2);
    dydx
}

fn spectral(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    // The samples cover one period, the point at x[0] + period is not included.
    let period = n as f64 * (x[1] - x[0]);

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex64> = y.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    fft.process(&mut buffer);

    for (i, c) in buffer.iter_mut().enumerate() {
        let k = if 2 * i < n {
            i as f64
        } else if 2 * i == n {
            // Nyquist mode
            0.0
        } else {
            i as f64 - n as f64
        };
        *c *= Complex64::new(0.0, 2.0 * PI * k / period);
    }

    ifft.process(&mut buffer);
    buffer.iter().map(|c| c.re / n as f64).collect()
}
