//! Error types for network synthesis.

use lib_dsp::DspError;
use lib_types::NetworkShapeError;
use thiserror::Error;

/// Errors raised while building or transforming RC networks.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Interpolation or resampling failed.
    #[error(transparent)]
    Dsp(#[from] DspError),

    /// Resistance and capacitance lists differ in length.
    #[error(transparent)]
    Shape(#[from] NetworkShapeError),

    /// Every spectrum sample fell below the zero floor.
    #[error(
        "Foster network: time-constant spectrum is empty after filtering \
         (no amplitude above {floor:e}); check the deconvolution output"
    )]
    EmptySpectrum { floor: f64 },

    /// Synthesis was asked to run on an empty Foster network.
    #[error("Cauer synthesis: Foster network is empty")]
    EmptyNetwork,

    /// A Foster element is zero, negative or not finite.
    #[error(
        "Cauer synthesis: Foster pair {index} has R = {resistance}, C = {capacitance}; \
         both must be positive and finite"
    )]
    InvalidElement {
        index: usize,
        resistance: f64,
        capacitance: f64,
    },

    /// Requested precision is too small to be useful.
    #[error("Invalid precision: {bits} bits (minimum {min})")]
    InvalidPrecision { bits: usize, min: usize },

    /// A value could not be represented in arbitrary precision.
    #[error("Non-finite value {0} cannot be converted to arbitrary precision")]
    NonFinite(f64),

    /// A parameter is outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;
