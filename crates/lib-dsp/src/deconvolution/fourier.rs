//! Fourier-domain deconvolution.

use super::circular_kernel;
use crate::error::{DspError, DspResult};
use crate::fft::{fft_frequencies, power_spectrum, FftEngine};
use crate::filter::FilterConfig;
use num_complex::Complex64;

/// Frequency-domain intermediates, kept for re-display.
#[derive(Clone, Debug)]
pub struct FourierDiagnostics {
    /// DFT sample frequencies (cycles per unit `ln t`).
    pub frequencies: Vec<f64>,

    /// DFT of the padded derivative.
    pub derivative_spectrum: Vec<Complex64>,

    /// DFT of the sampled weighting kernel.
    pub kernel_spectrum: Vec<Complex64>,

    /// Periodogram `|D·δ|²` of the derivative.
    pub periodogram: Vec<f64>,

    /// Low-pass response applied to the quotient.
    pub filter: Vec<f64>,
}

/// Require bit-identical frequency grids.
pub fn check_frequency_grids(derivative: &[f64], kernel: &[f64]) -> DspResult<()> {
    if derivative != kernel {
        return Err(DspError::FrequencyGridMismatch {
            derivative: derivative.len(),
            kernel: kernel.len(),
        });
    }
    Ok(())
}

/// Divide the derivative spectrum by the kernel spectrum, filter, invert.
///
/// `derivative` must be zero-padded on a uniform grid of spacing `delta`.
pub fn fourier_deconvolve(
    derivative: &[f64],
    delta: f64,
    filter: &FilterConfig,
) -> DspResult<(Vec<f64>, FourierDiagnostics)> {
    let n = derivative.len();
    if n < 2 {
        return Err(DspError::InsufficientData { needed: 2, got: n });
    }
    if !(delta > 0.0) {
        return Err(DspError::InvalidParameter(format!(
            "grid spacing must be positive, got {}",
            delta
        )));
    }

    let mut engine = FftEngine::new();

    let derivative_spectrum = engine.fft_real(derivative)?;
    let frequencies = fft_frequencies(n, delta);

    let kernel = circular_kernel(n, delta);
    let kernel_spectrum = engine.fft_real(&kernel)?;
    let kernel_frequencies = fft_frequencies(kernel.len(), delta);

    check_frequency_grids(&frequencies, &kernel_frequencies)?;

    let response = filter.response(&frequencies);

    let quotient: Vec<Complex64> = derivative_spectrum
        .iter()
        .zip(kernel_spectrum.iter())
        .zip(response.iter())
        .map(|((&d, &k), &h)| {
            if h == 0.0 || k.norm_sqr() == 0.0 {
                Complex64::new(0.0, 0.0)
            } else {
                d / k * h
            }
        })
        .collect();

    let spectrum = engine.ifft_real(&quotient)?;

    let passband = response.iter().filter(|&&h| h > 0.0).count();
    tracing::debug!(
        "fourier deconvolution: {} bins, {} in passband, cutoff {:.3}",
        n,
        passband,
        filter.cutoff
    );

    let periodogram = power_spectrum(&derivative_spectrum, delta);

    Ok((
        spectrum,
        FourierDiagnostics {
            frequencies,
            derivative_spectrum,
            kernel_spectrum,
            periodogram,
            filter: response,
        },
    ))
}
