//! # lib-dsp
//!
//! Numerical core for the first two stages of thermal transient analysis.
//!
//! This crate turns a log-time impedance curve into a time-constant spectrum:
//!
//! - **Derivative**: adaptive local-regression smoothing and `dZ/d ln t`
//! - **Deconvolution**: Fourier division, Richardson–Lucy, non-negative lasso
//! - **Filters**: low-pass windows for the Fourier strategy
//! - **FFT/Convolution**: transforms of any length, linear convolution
//! - **Forward model**: spectrum back to derivative and impedance
//! - **Interpolation/Integration**: splines, resampling, cumulative trapezoid
//! - **Noise/Statistics**: seeded Gaussian noise and percentile bands for bootstrapping

pub mod error;
pub mod fft;
pub mod filter;
pub mod interpolation;
pub mod integrate;
pub mod convolution;
pub mod derivative;
pub mod deconvolution;
pub mod forward;
pub mod noise;
pub mod statistics;

pub use error::{DspError, DspResult};
pub use fft::FftEngine;
pub use filter::{FilterConfig, FilterKind};
pub use derivative::{estimate_derivative, DerivativeConfig, DerivativeEstimate};
pub use deconvolution::{
    deconvolve, Deconvolution, DeconvolutionMethod, FourierDiagnostics, LassoConfig, Penalty,
    TauGrid,
};
pub use forward::{back_calculate, ForwardModel};
pub use interpolation::CubicSpline;
pub use noise::add_gaussian_noise;
pub use statistics::{percentile, Band};
