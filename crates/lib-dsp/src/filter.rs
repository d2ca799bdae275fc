//! Low-pass filter families for Fourier deconvolution.
//!
//! Dividing by the kernel spectrum amplifies high-frequency noise without
//! bound, so the quotient is multiplied by a smooth low-pass response before
//! the inverse transform. Every family is evaluated on the normalized
//! frequency `x = |f| / f_c`, where the cutoff `f_c` is given in cycles per
//! unit of `ln t`. The kernel spectrum decays like `|Γ(1 + 2πif)|`, so the
//! cutoff bounds the noise gain independently of the grid resolution.
//!
//! All families except Fermi are exactly zero beyond the cutoff. The Fermi
//! response has an exponential tail whose width is the shape parameter.

use std::f64::consts::PI;

/// Default Gaussian width (in units of the cutoff) when no shape parameter is given.
pub const DEFAULT_GAUSSIAN_SIGMA: f64 = 0.4;

/// Default Fermi edge width (in units of the cutoff) when no shape parameter is given.
pub const DEFAULT_FERMI_WIDTH: f64 = 0.05;

/// Low-pass filter family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterKind {
    /// Flat passband with a hard edge at the cutoff.
    Rectangular,

    /// Raised cosine falling from 1 at DC to 0 at the cutoff.
    #[default]
    Hann,

    /// Gaussian `exp(−x²/2σ²)`; the shape parameter is σ.
    Gaussian,

    /// Fermi–Dirac step `1/(1 + exp((x−1)/T))`; the shape parameter is T.
    Fermi,

    /// Four-term Nuttall cosine window.
    Nuttall,

    /// Four-term Blackman–Harris cosine window.
    BlackmanHarris,

    /// Four-term Blackman–Nuttall cosine window.
    BlackmanNuttall,
}

impl FilterKind {
    /// Coefficients of the four-term cosine families.
    fn cosine_terms(self) -> Option<[f64; 4]> {
        match self {
            Self::Nuttall => Some([0.355768, 0.487396, 0.144232, 0.012604]),
            Self::BlackmanHarris => Some([0.35875, 0.48829, 0.14128, 0.01168]),
            Self::BlackmanNuttall => Some([0.3635819, 0.4891775, 0.1365995, 0.0106411]),
            _ => None,
        }
    }
}

/// Filter selection for Fourier deconvolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterConfig {
    /// Filter family.
    pub kind: FilterKind,

    /// Cutoff frequency in cycles per unit `ln t`.
    pub cutoff: f64,

    /// Family-specific shape parameter (Gaussian σ, Fermi T). Values ≤ 0
    /// select the family default.
    pub parameter: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::Hann,
            cutoff: 0.60,
            parameter: 0.0,
        }
    }
}

impl FilterConfig {
    /// Response at normalized frequency `x ≥ 0`.
    pub fn response_at(&self, x: f64) -> f64 {
        if self.kind == FilterKind::Fermi {
            let width = if self.parameter > 0.0 {
                self.parameter
            } else {
                DEFAULT_FERMI_WIDTH
            };
            return 1.0 / (1.0 + ((x - 1.0) / width).exp());
        }

        if x > 1.0 {
            return 0.0;
        }

        if let Some([a0, a1, a2, a3]) = self.kind.cosine_terms() {
            // Centered form: peak at x = 0, zero at x = 1.
            return a0 + a1 * (PI * x).cos() + a2 * (2.0 * PI * x).cos() + a3 * (3.0 * PI * x).cos();
        }

        match self.kind {
            FilterKind::Rectangular => 1.0,
            FilterKind::Hann => 0.5 + 0.5 * (PI * x).cos(),
            FilterKind::Gaussian => {
                let sigma = if self.parameter > 0.0 {
                    self.parameter
                } else {
                    DEFAULT_GAUSSIAN_SIGMA
                };
                (-x * x / (2.0 * sigma * sigma)).exp()
            }
            _ => 0.0,
        }
    }

    /// Evaluate the filter on a DFT frequency grid.
    pub fn response(&self, frequencies: &[f64]) -> Vec<f64> {
        if self.cutoff <= 0.0 {
            return vec![0.0; frequencies.len()];
        }
        frequencies
            .iter()
            .map(|f| self.response_at(f.abs() / self.cutoff))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FilterKind; 7] = [
        FilterKind::Rectangular,
        FilterKind::Hann,
        FilterKind::Gaussian,
        FilterKind::Fermi,
        FilterKind::Nuttall,
        FilterKind::BlackmanHarris,
        FilterKind::BlackmanNuttall,
    ];

    fn config(kind: FilterKind) -> FilterConfig {
        FilterConfig {
            kind,
            ..FilterConfig::default()
        }
    }

    #[test]
    fn test_unity_at_dc() {
        for kind in ALL {
            let r = config(kind).response_at(0.0);
            // Fermi is 1/(1+e^{-20}) at DC, the cosine sums are exact to their rounding.
            assert!((r - 1.0).abs() < 1e-6, "{:?} at DC = {}", kind, r);
        }
    }

    #[test]
    fn test_zero_beyond_cutoff() {
        for kind in ALL {
            let r = config(kind).response_at(1.2);
            if kind == FilterKind::Fermi {
                assert!(r > 0.0 && r < 0.05);
            } else {
                assert_eq!(r, 0.0, "{:?}", kind);
            }
        }
    }

    #[test]
    fn test_hann_edges() {
        let hann = config(FilterKind::Hann);
        assert!((hann.response_at(0.5) - 0.5).abs() < 1e-12);
        assert!(hann.response_at(1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_windows_vanish_at_cutoff() {
        for kind in [
            FilterKind::Nuttall,
            FilterKind::BlackmanHarris,
            FilterKind::BlackmanNuttall,
        ] {
            let r = config(kind).response_at(1.0);
            assert!(r.abs() < 1e-3, "{:?} at cutoff = {}", kind, r);
        }
    }

    #[test]
    fn test_monotone_passband() {
        for kind in ALL {
            let cfg = config(kind);
            let samples: Vec<f64> = (0..=50).map(|i| cfg.response_at(i as f64 / 50.0)).collect();
            assert!(
                samples.windows(2).all(|w| w[1] <= w[0] + 1e-12),
                "{:?} not monotone",
                kind
            );
        }
    }

    #[test]
    fn test_response_on_grid() {
        let freqs = crate::fft::fft_frequencies(10, 1.0);
        let cfg = FilterConfig {
            kind: FilterKind::Rectangular,
            cutoff: 0.25,
            parameter: 0.0,
        };
        let resp = cfg.response(&freqs);
        // Bins 0, ±0.1, ±0.2 pass.
        let passed = resp.iter().filter(|&&r| r == 1.0).count();
        assert_eq!(passed, 5);
        // Symmetric in frequency.
        assert_eq!(resp[1], resp[9]);
    }

    #[test]
    fn test_gaussian_parameter() {
        let narrow = FilterConfig {
            kind: FilterKind::Gaussian,
            cutoff: 1.0,
            parameter: 0.1,
        };
        let wide = FilterConfig {
            parameter: 0.8,
            ..narrow
        };
        assert!(narrow.response_at(0.3) < wide.response_at(0.3));
    }
}
