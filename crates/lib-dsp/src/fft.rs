//! Transforms on the log-time grid.
//!
//! Derivative grids are padded to arbitrary lengths, so every transform here
//! accepts any `n`. Complex transforms back the Fourier deconvolution; the
//! real-to-complex pair backs linear convolution.

use crate::error::{DspError, DspResult};
use num_complex::Complex64;
use realfft::RealFftPlanner;
use rustfft::FftPlanner;

/// Planners for complex and real transforms, reused across calls.
pub struct FftEngine {
    /// Complex FFT planner.
    complex_planner: FftPlanner<f64>,

    /// Real FFT planner.
    real_planner: RealFftPlanner<f64>,
}

impl FftEngine {
    /// Create a new FFT engine.
    pub fn new() -> Self {
        Self {
            complex_planner: FftPlanner::new(),
            real_planner: RealFftPlanner::new(),
        }
    }

    /// Perform forward FFT on complex data in-place.
    pub fn fft_inplace(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        if data.is_empty() {
            return Err(DspError::InsufficientData { needed: 1, got: 0 });
        }

        let fft = self.complex_planner.plan_fft_forward(data.len());
        fft.process(data);
        Ok(())
    }

    /// Perform inverse FFT on complex data in-place, normalized by `1/N`.
    pub fn ifft_inplace(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        let len = data.len();
        if len == 0 {
            return Err(DspError::InsufficientData { needed: 1, got: 0 });
        }

        let fft = self.complex_planner.plan_fft_inverse(len);
        fft.process(data);

        let scale = 1.0 / len as f64;
        for x in data.iter_mut() {
            *x *= scale;
        }

        Ok(())
    }

    /// Forward FFT of a real signal, returning the full complex spectrum.
    pub fn fft_real(&mut self, data: &[f64]) -> DspResult<Vec<Complex64>> {
        let mut result: Vec<Complex64> = data.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.fft_inplace(&mut result)?;
        Ok(result)
    }

    /// Inverse FFT, keeping only the real part.
    pub fn ifft_real(&mut self, data: &[Complex64]) -> DspResult<Vec<f64>> {
        let mut result = data.to_vec();
        self.ifft_inplace(&mut result)?;
        Ok(result.into_iter().map(|c| c.re).collect())
    }

    /// Perform forward real-to-complex FFT.
    ///
    /// Input: N real samples
    /// Output: N/2 + 1 complex samples (Hermitian symmetry exploited)
    pub fn rfft(&mut self, data: &[f64]) -> DspResult<Vec<Complex64>> {
        if data.is_empty() {
            return Err(DspError::InsufficientData { needed: 1, got: 0 });
        }

        let r2c = self.real_planner.plan_fft_forward(data.len());
        let mut input = data.to_vec();
        let mut output = r2c.make_output_vec();

        r2c.process(&mut input, &mut output)
            .map_err(|e| DspError::NumericalInstability(e.to_string()))?;

        Ok(output)
    }

    /// Perform inverse complex-to-real FFT.
    ///
    /// Input: N/2 + 1 complex samples
    /// Output: N real samples
    pub fn irfft(&mut self, data: &[Complex64], output_len: usize) -> DspResult<Vec<f64>> {
        let expected_input_len = output_len / 2 + 1;
        if output_len == 0 || data.len() != expected_input_len {
            return Err(DspError::LengthMismatch {
                expected: expected_input_len,
                actual: data.len(),
            });
        }

        let c2r = self.real_planner.plan_fft_inverse(output_len);
        let mut input = data.to_vec();
        // The DC bin (and Nyquist for even lengths) must be purely real.
        input[0].im = 0.0;
        if output_len % 2 == 0 {
            input[expected_input_len - 1].im = 0.0;
        }
        let mut output = c2r.make_output_vec();

        c2r.process(&mut input, &mut output)
            .map_err(|e| DspError::NumericalInstability(e.to_string()))?;

        let scale = 1.0 / output_len as f64;
        for x in output.iter_mut() {
            *x *= scale;
        }

        Ok(output)
    }
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample frequencies of an `n`-point DFT with sample spacing `d`.
///
/// Ordered like the transform output: `[0, 1, …, ⌈n/2⌉−1, −⌊n/2⌋, …, −1] / (n·d)`.
pub fn fft_frequencies(n: usize, d: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * d);
    let positive = (n + 1) / 2;
    (0..n)
        .map(|i| {
            let k = if i < positive {
                i as isize
            } else {
                i as isize - n as isize
            };
            k as f64 * scale
        })
        .collect()
}

/// Periodogram `|X·d|²` of a spectrum computed with spacing `d`.
pub fn power_spectrum(spectrum: &[Complex64], d: f64) -> Vec<f64> {
    spectrum.iter().map(|c| (*c * d).norm_sqr()).collect()
}

/// Zero-pad a signal to a specific length.
pub fn zero_pad(signal: &[f64], new_len: usize) -> Vec<f64> {
    let mut result = signal.to_vec();
    if new_len > signal.len() {
        result.resize(new_len, 0.0);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_ifft_roundtrip_any_length() {
        let mut engine = FftEngine::new();

        // Derivative grids are rarely a power of two.
        let n = 255;
        let signal: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                (2.0 * PI * 4.0 * t).sin() + 0.3
            })
            .collect();

        let spectrum = engine.fft_real(&signal).unwrap();
        let recovered = engine.ifft_real(&spectrum).unwrap();

        for (orig, rec) in signal.iter().zip(recovered.iter()) {
            assert!((orig - rec).abs() < 1e-10);
        }
    }

    #[test]
    fn test_rfft_irfft_roundtrip() {
        let mut engine = FftEngine::new();

        for n in [64usize, 99] {
            let signal: Vec<f64> = (0..n).map(|i| (-(i as f64) * 0.05).exp()).collect();

            let spectrum = engine.rfft(&signal).unwrap();
            assert_eq!(spectrum.len(), n / 2 + 1);
            let recovered = engine.irfft(&spectrum, n).unwrap();

            for (orig, rec) in signal.iter().zip(recovered.iter()) {
                assert!((orig - rec).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_fft_frequencies_even_and_odd() {
        let even = fft_frequencies(4, 0.5);
        assert_eq!(even, vec![0.0, 0.5, -1.0, -0.5]);

        let odd = fft_frequencies(5, 1.0);
        assert_eq!(odd, vec![0.0, 0.2, 0.4, -0.4, -0.2]);
    }

    #[test]
    fn test_fft_frequencies_deterministic() {
        // Identical inputs must give bit-identical grids.
        assert_eq!(fft_frequencies(263, 0.0734), fft_frequencies(263, 0.0734));
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut engine = FftEngine::new();
        assert!(matches!(
            engine.fft_real(&[]),
            Err(DspError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_power_spectrum_dc() {
        let mut engine = FftEngine::new();
        let spectrum = engine.fft_real(&[1.0; 8]).unwrap();
        let power = power_spectrum(&spectrum, 0.5);
        assert!((power[0] - 16.0).abs() < 1e-12);
        assert!(power[1..].iter().all(|&p| p < 1e-20));
    }
}
