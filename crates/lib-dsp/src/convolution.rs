//! Linear convolution.
//!
//! The direct form is O(n·m) and serves short kernels and validation. The
//! FFT form zero-pads both inputs to the full output length and uses a
//! real-to-complex transform of any length.

use crate::error::{DspError, DspResult};
use crate::fft::{zero_pad, FftEngine};

/// Direct convolution (for comparison/validation).
///
/// This is O(n*m) and should only be used for short signals.
pub fn direct_convolve(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    let output_len = signal.len() + kernel.len() - 1;
    let mut output = vec![0.0; output_len];

    for (i, &s) in signal.iter().enumerate() {
        for (j, &k) in kernel.iter().enumerate() {
            output[i + j] += s * k;
        }
    }

    output
}

/// Full linear convolution through a single real FFT.
pub fn fft_convolve(signal: &[f64], kernel: &[f64]) -> DspResult<Vec<f64>> {
    if signal.is_empty() || kernel.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    let output_len = signal.len() + kernel.len() - 1;

    let mut engine = FftEngine::new();
    let mut signal_fft = engine.rfft(&zero_pad(signal, output_len))?;
    let kernel_fft = engine.rfft(&zero_pad(kernel, output_len))?;

    for (s, k) in signal_fft.iter_mut().zip(kernel_fft.iter()) {
        *s *= *k;
    }

    engine.irfft(&signal_fft, output_len)
}

/// Convolution with the output restricted to the input grid.
///
/// `kernel` is sampled at lags `−(n−1) … (n−1)` for a signal of length `n`
/// (length `2n − 1`, lag 0 at index `n − 1`). Returns
/// `out[i] = Σ_j signal[j] · kernel[(i − j) + n − 1]`.
pub fn convolve_same(signal: &[f64], kernel: &[f64]) -> DspResult<Vec<f64>> {
    let n = signal.len();
    if n == 0 {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    if kernel.len() != 2 * n - 1 {
        return Err(DspError::LengthMismatch {
            expected: 2 * n - 1,
            actual: kernel.len(),
        });
    }

    let full = if n <= 64 {
        direct_convolve(signal, kernel)
    } else {
        fft_convolve(signal, kernel)?
    };
    Ok(full[n - 1..2 * n - 1].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_convolve_impulse() {
        let signal = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let kernel = vec![1.0];

        let result = direct_convolve(&signal, &kernel);
        assert_eq!(result, signal);
    }

    #[test]
    fn test_direct_convolve_shift() {
        let signal = vec![1.0, 2.0, 3.0, 4.0];
        let kernel = vec![0.0, 1.0];

        let result = direct_convolve(&signal, &kernel);
        assert_eq!(result, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fft_convolve_matches_direct() {
        // Odd output length exercises the non-power-of-two path.
        let signal = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let kernel = vec![1.0, 0.5, 0.25];

        let direct = direct_convolve(&signal, &kernel);
        let fft = fft_convolve(&signal, &kernel).unwrap();

        assert_eq!(direct.len(), fft.len());
        for (d, f) in direct.iter().zip(fft.iter()) {
            assert!((d - f).abs() < 1e-10);
        }
    }

    #[test]
    fn test_convolve_same_centered_delta() {
        let signal: Vec<f64> = (0..100).map(|i| (i as f64 * 0.1).cos()).collect();
        let mut kernel = vec![0.0; 199];
        kernel[99] = 1.0;
        let out = convolve_same(&signal, &kernel).unwrap();
        for (a, b) in signal.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_convolve_same_rejects_bad_kernel() {
        assert!(matches!(
            convolve_same(&[1.0, 2.0], &[1.0, 2.0]),
            Err(DspError::LengthMismatch { expected: 3, actual: 2 })
        ));
    }
}
