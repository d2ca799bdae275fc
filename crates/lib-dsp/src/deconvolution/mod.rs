//! Time-constant spectrum deconvolution.
//!
//! The log-time derivative of the impedance is the convolution of the
//! time-constant spectrum `R(ζ)` with the single-pole response
//! `w(z) = exp(z − exp(z))`:
//!
//! ```text
//! dZ/dz (z) = ∫ R(ζ) · w(z − ζ) dζ,     z = ln t, ζ = ln τ
//! ```
//!
//! Three strategies invert this relation. All of them return the spectrum on
//! the padded derivative grid.

pub mod bayesian;
pub mod fourier;
pub mod lasso;

pub use bayesian::{bayesian_deconvolve, response_matrix};
pub use fourier::{check_frequency_grids, fourier_deconvolve, FourierDiagnostics};
pub use lasso::{lasso_deconvolve, LassoConfig, Penalty, TauGrid};

use crate::derivative::DerivativeEstimate;
use crate::error::{DspError, DspResult};
use crate::filter::FilterConfig;
use crate::integrate::cumulative_trapezoid;
use lib_types::TimeConstantSpectrum;

/// Lags beyond this (in `ln` units) carry no weight: `w(6) ≈ e^{−397}`.
const KERNEL_POSITIVE_REACH: f64 = 6.0;

/// Single-pole log-time impulse response `w(z) = exp(z − exp(z))`.
#[inline]
pub fn weight_kernel(z: f64) -> f64 {
    (z - z.exp()).exp()
}

/// Step response matching [`weight_kernel`]: `1 − exp(−exp(z))`.
#[inline]
pub fn weight_kernel_integral(z: f64) -> f64 {
    1.0 - (-z.exp()).exp()
}

/// Signed lag (in samples) of circular index `i` for an `n`-point kernel.
///
/// Positive lags cover the short decay of `w` for `z > 0`; the remaining
/// indices wrap to negative lags, where `w` decays only like `e^z`.
pub(crate) fn circular_lag(i: usize, n: usize, delta: f64) -> isize {
    let reach = (KERNEL_POSITIVE_REACH / delta).ceil() as usize + 1;
    let positive = reach.clamp(1, n.saturating_sub(1).max(1));
    if i < positive {
        i as isize
    } else {
        i as isize - n as isize
    }
}

/// `w(k·δ)·δ` at the circular lags of an `n`-point grid.
pub fn circular_kernel(n: usize, delta: f64) -> Vec<f64> {
    (0..n)
        .map(|i| weight_kernel(circular_lag(i, n, delta) as f64 * delta) * delta)
        .collect()
}

/// Deconvolution strategy.
#[derive(Clone, Debug, PartialEq)]
pub enum DeconvolutionMethod {
    /// Frequency-domain division by the kernel spectrum with a low-pass filter.
    Fourier(FilterConfig),

    /// Richardson–Lucy iteration for a fixed number of steps.
    Bayesian { steps: usize },

    /// Non-negative L1-regularized regression on exponential step responses.
    Lasso(LassoConfig),
}

impl Default for DeconvolutionMethod {
    fn default() -> Self {
        Self::Bayesian { steps: 1000 }
    }
}

impl DeconvolutionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fourier(_) => "fourier",
            Self::Bayesian { .. } => "bayesian",
            Self::Lasso(_) => "lasso",
        }
    }
}

/// Deconvolution output.
#[derive(Clone, Debug)]
pub struct Deconvolution {
    /// Spectrum on the padded log-time grid.
    pub spectrum: TimeConstantSpectrum,

    /// Cumulative trapezoid of the spectrum over `ln τ`.
    pub cumulative: Vec<f64>,

    /// Frequency-domain intermediates of the Fourier strategy.
    pub fourier: Option<FourierDiagnostics>,
}

/// Deconvolve a derivative estimate into a time-constant spectrum.
pub fn deconvolve(
    estimate: &DerivativeEstimate,
    method: &DeconvolutionMethod,
) -> DspResult<Deconvolution> {
    let grid = &estimate.padded_log_time;
    let derivative = &estimate.padded_derivative;
    if grid.len() != derivative.len() {
        return Err(DspError::LengthMismatch {
            expected: grid.len(),
            actual: derivative.len(),
        });
    }

    let (amplitude, fourier) = match method {
        DeconvolutionMethod::Fourier(filter) => {
            let (spec, diag) = fourier_deconvolve(derivative, estimate.delta, filter)?;
            (spec, Some(diag))
        }
        DeconvolutionMethod::Bayesian { steps } => {
            let matrix = response_matrix(grid.len(), estimate.delta);
            (bayesian_deconvolve(&matrix, derivative, *steps)?, None)
        }
        DeconvolutionMethod::Lasso(config) => (lasso_deconvolve(estimate, config)?, None),
    };

    if amplitude.iter().any(|a| !a.is_finite()) {
        return Err(DspError::NumericalInstability(format!(
            "{} deconvolution produced non-finite spectrum values",
            method.name()
        )));
    }

    let spectrum = TimeConstantSpectrum::new(grid.clone(), amplitude);
    let cumulative = cumulative_trapezoid(&spectrum.amplitude, &spectrum.log_tau);

    tracing::debug!(
        "{} deconvolution: {} samples, {} negative, total R ≈ {:.4}",
        method.name(),
        spectrum.len(),
        spectrum.negative_count(),
        cumulative.last().copied().unwrap_or(0.0)
    );

    Ok(Deconvolution {
        spectrum,
        cumulative,
        fourier,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::synthetic_estimate;
    use super::*;

    #[test]
    fn test_weight_kernel_normalized() {
        // ∫ w(z) dz = 1
        let delta = 0.01;
        let total: f64 = (-4000..1000).map(|k| weight_kernel(k as f64 * delta) * delta).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((weight_kernel(0.0) - (-1.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_circular_kernel_layout() {
        let kernel = circular_kernel(100, 0.1);
        // Lag 0 first, the negative tail wraps to the end.
        assert!((kernel[0] - weight_kernel(0.0) * 0.1).abs() < 1e-15);
        assert!((kernel[99] - weight_kernel(-0.1) * 0.1).abs() < 1e-15);
        assert!(kernel.iter().all(|&k| k >= 0.0));
    }

    #[test]
    fn test_every_method_returns_padded_grid() {
        let (estimate, _) = synthetic_estimate(&[(-6.0, 0.6, 1.0)]);
        let methods = [
            DeconvolutionMethod::Fourier(FilterConfig::default()),
            DeconvolutionMethod::Bayesian { steps: 200 },
            DeconvolutionMethod::Lasso(LassoConfig {
                tau_grid: TauGrid::LogSpaced { count: 50 },
                penalty: Penalty::Fixed(1e-5),
                ..LassoConfig::default()
            }),
        ];
        for method in &methods {
            let result = deconvolve(&estimate, method).unwrap();
            assert_eq!(result.spectrum.len(), estimate.padded_len());
            assert_eq!(result.cumulative.len(), estimate.padded_len());
            assert!(result.spectrum.amplitude.iter().all(|v| v.is_finite()));
            assert_eq!(
                result.fourier.is_some(),
                matches!(method, DeconvolutionMethod::Fourier(_))
            );
        }
    }

    #[test]
    fn test_cumulative_spectrum_recovers_total_resistance() {
        // Height h, width s: ∫ = h · s · √(2π)
        let (estimate, _) = synthetic_estimate(&[(-5.0, 0.5, 2.0)]);
        let expected = 2.0 * 0.5 * (2.0 * std::f64::consts::PI).sqrt();
        let result = deconvolve(&estimate, &DeconvolutionMethod::Bayesian { steps: 500 }).unwrap();
        let total = *result.cumulative.last().unwrap();
        assert!((total - expected).abs() / expected < 0.05, "total {}", total);
    }
}
