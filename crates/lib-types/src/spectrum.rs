//! Time-constant spectra.
//!
//! A spectrum is a density of thermal resistance over `ln(τ)`, sampled on a
//! uniform log-time grid. Amplitudes are ideally non-negative; deconvolution
//! noise can leave small negative artifacts which downstream code tolerates.

use serde::{Deserialize, Serialize};

/// Resistance density (K/W per unit `ln τ`) on a uniform `ln τ` grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeConstantSpectrum {
    /// Natural-log time constants, strictly increasing.
    pub log_tau: Vec<f64>,

    /// Spectrum amplitude at each grid point.
    pub amplitude: Vec<f64>,
}

impl TimeConstantSpectrum {
    pub fn new(log_tau: Vec<f64>, amplitude: Vec<f64>) -> Self {
        debug_assert_eq!(log_tau.len(), amplitude.len());
        Self { log_tau, amplitude }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.log_tau.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.log_tau.is_empty()
    }

    /// Time constants in seconds.
    pub fn tau(&self) -> Vec<f64> {
        self.log_tau.iter().map(|x| x.exp()).collect()
    }

    /// Grid spacing, assuming a uniform grid. Zero for fewer than 2 points.
    pub fn spacing(&self) -> f64 {
        if self.log_tau.len() < 2 {
            return 0.0;
        }
        self.log_tau[1] - self.log_tau[0]
    }

    /// Number of negative amplitude samples.
    pub fn negative_count(&self) -> usize {
        self.amplitude.iter().filter(|&&a| a < 0.0).count()
    }

    /// Largest amplitude, or 0 for an empty spectrum.
    pub fn peak(&self) -> f64 {
        self.amplitude.iter().copied().fold(0.0, f64::max)
    }

    /// Rectangle-rule total resistance: `Σ amplitude · Δ`.
    pub fn total_resistance(&self) -> f64 {
        self.amplitude.iter().sum::<f64>() * self.spacing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_accessors() {
        let spec = TimeConstantSpectrum::new(vec![-1.0, 0.0, 1.0], vec![0.5, -0.1, 2.0]);
        assert_eq!(spec.len(), 3);
        assert!((spec.spacing() - 1.0).abs() < 1e-15);
        assert_eq!(spec.negative_count(), 1);
        assert!((spec.peak() - 2.0).abs() < 1e-15);
        assert!((spec.tau()[1] - 1.0).abs() < 1e-15);
        assert!((spec.total_resistance() - 2.4).abs() < 1e-12);
    }
}
