/// Event location defaults
pub mod refine {
    /// Absolute width in x below which a bracket is considered resolved
    pub const DEFAULT_TOLERANCE: f64 = 1.0e-6;

    /// Maximum number of trial evaluations per bracket
    pub const MAX_ITERATIONS: usize = 100;
}

/// Stiffness detection thresholds for the Dormand-Prince stepper
pub mod stiffness {
    /// Stiffness threshold for DOPRI5 method
    /// Based on Hairer & Wanner, "Solving Ordinary Differential Equations II"
    pub const DOPRI5_THRESHOLD: f64 = 3.25;

    /// Maximum consecutive stiffness detections before error
    pub const MAX_STIFF_ITERATIONS: u32 = 15;

    /// Number of non-stiff steps needed to reset stiffness counter
    pub const NON_STIFF_RESET_COUNT: u32 = 6;
}

/// Initial step size computation constants
pub mod initial_step {
    /// Minimum norm for the initial step computation
    pub const MIN_NORM: f64 = 1.0e-10;

    /// Default initial step when the norms are too small
    pub const DEFAULT_INITIAL_STEP: f64 = 1.0e-6;

    /// Safety factor for initial step estimation
    pub const SAFETY_FACTOR: f64 = 0.01;
}
