//! Error types for DSP operations.

use thiserror::Error;

/// Errors that can occur while estimating derivatives or deconvolving.
#[derive(Debug, Error)]
pub enum DspError {
    /// Input length mismatch.
    #[error("Input length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Insufficient data for operation.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// The derivative stage produced nothing but zeros.
    #[error(
        "derivative estimation: impedance derivative is empty or all zeros; \
         check heating/cooling polarity of the transient"
    )]
    EmptyDerivative,

    /// The derivative and weighting kernel were transformed on different grids.
    #[error(
        "Fourier deconvolution: frequency grids of derivative ({derivative} bins) \
         and weighting kernel ({kernel} bins) do not match"
    )]
    FrequencyGridMismatch { derivative: usize, kernel: usize },

    /// Lasso returned an all-zero solution.
    #[error(
        "regularized deconvolution: no active coefficients; \
         the penalty is too strong or the impedance does not rise"
    )]
    NoActiveCoefficients,

    /// A parameter is outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Numerical instability detected.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;
