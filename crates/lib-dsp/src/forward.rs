//! Forward model: spectrum back to derivative and impedance.
//!
//! Used to check a deconvolution against the data it came from.

use crate::convolution::convolve_same;
use crate::deconvolution::weight_kernel;
use crate::error::{DspError, DspResult};
use crate::integrate::cumulative_trapezoid_uniform;
use lib_types::TimeConstantSpectrum;

/// Back-calculated curves on the spectrum grid.
#[derive(Clone, Debug)]
pub struct ForwardModel {
    pub log_time: Vec<f64>,
    pub derivative: Vec<f64>,
    pub impedance: Vec<f64>,
}

/// `w(k·δ)·δ` for lags `−(n−1) … (n−1)`, lag 0 at index `n − 1`.
fn linear_kernel(n: usize, delta: f64) -> Vec<f64> {
    (0..2 * n - 1)
        .map(|i| weight_kernel((i as f64 - (n - 1) as f64) * delta) * delta)
        .collect()
}

/// Convolve a spectrum with `w` and integrate the result over `ln t`.
///
/// The spectrum grid must be uniform. The impedance starts at zero on the
/// first grid point.
pub fn back_calculate(spectrum: &TimeConstantSpectrum) -> DspResult<ForwardModel> {
    let n = spectrum.len();
    if n < 2 {
        return Err(DspError::InsufficientData { needed: 2, got: n });
    }
    let delta = spectrum.spacing();
    if !(delta > 0.0) {
        return Err(DspError::InvalidParameter(format!(
            "spectrum grid must be increasing, spacing {}",
            delta
        )));
    }

    let derivative = convolve_same(&spectrum.amplitude, &linear_kernel(n, delta))?;
    let impedance = cumulative_trapezoid_uniform(&derivative, delta);

    Ok(ForwardModel {
        log_time: spectrum.log_tau.clone(),
        derivative,
        impedance,
    })
}
