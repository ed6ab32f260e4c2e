//! Linear least squares with confidence intervals on the fitted coefficients.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

/// Result of a linear regression.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub coefficients: DVector<f64>,
    /// `(lower, upper)` bound of each coefficient, present when a confidence level was requested.
    pub intervals: Option<Vec<(f64, f64)>>,
    pub standard_errors: Option<DVector<f64>>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegressError {
    #[error("Invalid argument: design matrix has {rows} rows but {len} observations were given")]
    DimensionMismatch { rows: usize, len: usize },
    #[error("Invalid argument: alpha must lie in (0, 1), got {alpha}")]
    InvalidAlpha { alpha: f64 },
    #[error("Invalid argument: {observations} observations leave no degree of freedom for {parameters} parameters")]
    NoDegreesOfFreedom {
        observations: usize,
        parameters: usize,
    },
    #[error("Least squares solve failed: {0}")]
    Solve(&'static str),
    #[error("Normal matrix is singular, standard errors are undefined")]
    Singular,
    #[error("Student's t distribution: {0}")]
    Distribution(String),
}

/// Solves `a * b = y` in the least squares sense.
///
/// The columns of `a` hold the values of the basis functions at each observation. When
/// `alpha` is given, the `100 * (1 - alpha)` percent confidence intervals and the standard
/// errors of the coefficients are computed from the residual variance and Student's t
/// distribution with `n - k` degrees of freedom.
///
/// # Example
///
/// ```
/// use ode_events::{regress, DMatrix, DVector};
///
/// // y = 1 + 2x
/// let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
/// let y = DVector::from_vec(vec![1.0, 3.0, 5.0]);
/// let fit = regress(&a, &y, None)?;
/// assert!((fit.coefficients[1] - 2.0).abs() < 1e-12);
/// # Ok::<(), ode_events::RegressError>(())
/// ```
pub fn regress(
    a: &DMatrix<f64>,
    y: &DVector<f64>,
    alpha: Option<f64>,
) -> Result<Regression, RegressError> {
    if a.nrows() != y.len() {
        return Err(RegressError::DimensionMismatch {
            rows: a.nrows(),
            len: y.len(),
        });
    }
    if let Some(alpha) = alpha {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(RegressError::InvalidAlpha { alpha });
        }
    }

    let (n, k) = a.shape();
    let svd = a.clone().svd(true, true);
    let eps = f64::EPSILON * n.max(k) as f64 * svd.singular_values.max();
    let coefficients = svd.solve(y, eps).map_err(RegressError::Solve)?;

    let alpha = match alpha {
        Some(alpha) => alpha,
        None => {
            return Ok(Regression {
                coefficients,
                intervals: None,
                standard_errors: None,
            })
        }
    };

    if n <= k {
        return Err(RegressError::NoDegreesOfFreedom {
            observations: n,
            parameters: k,
        });
    }
    let dof = (n - k) as f64;
    let residuals = y - a * &coefficients;
    let sigma2 = residuals.norm_squared() / dof;

    let covariance = (a.transpose() * a)
        .try_inverse()
        .ok_or(RegressError::Singular)?
        * sigma2;
    let standard_errors = covariance.diagonal().map(|c| c.sqrt());

    let t = StudentsT::new(0.0, 1.0, dof)
        .map_err(|e| RegressError::Distribution(e.to_string()))?
        .inverse_cdf(1.0 - alpha / 2.0);
    let intervals = coefficients
        .iter()
        .zip(standard_errors.iter())
        .map(|(beta, se)| (beta - t * se, beta + t * se))
        .collect();

    Ok(Regression {
        coefficients,
        intervals: Some(intervals),
        standard_errors: Some(standard_errors),
    })
}
