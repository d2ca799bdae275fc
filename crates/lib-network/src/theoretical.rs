//! Distributed RC lines as reference models.
//!
//! Each segment is a uniform RC transmission line with total resistance `R`
//! and capacitance `C`. Walking from the ambient end towards the source, a
//! segment turns its load `Z_L` into
//!
//! ```text
//! Z = Z₀ (Z_L + Z₀ tanh γ) / (Z_L tanh γ + Z₀),   γ = √(sRC),  Z₀ = √(R/(sC))
//! ```
//!
//! The last segment sees an ideal heat sink (`Z_L = 0`). The time-constant
//! spectrum is read just off the negative real axis,
//! `R(ζ) = Im Z(−e^{−ζ} e^{iδ}) / π`, which smears every pole into a
//! Lorentzian of width `δ`.

use crate::error::{NetworkError, NetworkResult};
use crate::structure::StructureFunction;
use lib_types::{NetworkShapeError, TimeConstantSpectrum};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Angle off the negative real axis, in degrees.
pub const DEFAULT_LINE_DELTA_DEGREES: f64 = 0.5;

/// Beyond this `|Re γ|`, `tanh γ` is ±1 to double precision.
const TANH_SATURATION: f64 = 20.0;

/// Chain of uniform RC lines, heat source first.
#[derive(Clone, Debug, PartialEq)]
pub struct DistributedLadder {
    pub resistance: Vec<f64>,
    pub capacitance: Vec<f64>,

    /// Physical length of each segment; unit lengths when not given.
    pub length: Vec<f64>,
}

/// Piecewise-linear structure function of a [`DistributedLadder`].
#[derive(Clone, Debug, PartialEq)]
pub struct LineProfile {
    pub structure: StructureFunction,

    /// Distance from the heat source at each structure point.
    pub position: Vec<f64>,
}

impl DistributedLadder {
    pub fn new(resistance: Vec<f64>, capacitance: Vec<f64>, length: Option<Vec<f64>>) -> NetworkResult<Self> {
        if resistance.len() != capacitance.len() {
            return Err(NetworkShapeError {
                resistances: resistance.len(),
                capacitances: capacitance.len(),
            }
            .into());
        }
        if resistance.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        for (index, (&r, &c)) in resistance.iter().zip(capacitance.iter()).enumerate() {
            if !(r > 0.0 && c > 0.0 && r.is_finite() && c.is_finite()) {
                return Err(NetworkError::InvalidElement {
                    index,
                    resistance: r,
                    capacitance: c,
                });
            }
        }

        let length = length.unwrap_or_else(|| vec![1.0; resistance.len()]);
        if length.len() != resistance.len() {
            return Err(NetworkError::InvalidParameter(format!(
                "{} segment lengths for {} segments",
                length.len(),
                resistance.len()
            )));
        }
        if let Some(bad) = length.iter().find(|l| !(**l > 0.0 && l.is_finite())) {
            return Err(NetworkError::InvalidParameter(format!(
                "segment lengths must be positive, got {}",
                bad
            )));
        }

        Ok(Self {
            resistance,
            capacitance,
            length,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resistance.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resistance.is_empty()
    }

    pub fn total_resistance(&self) -> f64 {
        self.resistance.iter().sum()
    }

    /// Driving-point impedance at complex frequency `s`.
    pub fn input_impedance(&self, s: Complex64) -> Complex64 {
        let mut z = Complex64::new(0.0, 0.0);
        for (&r, &c) in self.resistance.iter().zip(self.capacitance.iter()).rev() {
            let gamma = (s * r * c).sqrt();
            let z0 = (r / (s * c)).sqrt();
            let t = tanh_saturating(gamma);
            z = z0 * (z + t * z0) / (z * t + z0);
        }
        z
    }

    /// Exact spectrum on `log_tau`, smeared by `delta_degrees`.
    pub fn time_constant_spectrum(&self, log_tau: &[f64], delta_degrees: f64) -> NetworkResult<TimeConstantSpectrum> {
        if !(delta_degrees > 0.0 && delta_degrees < 90.0) {
            return Err(NetworkError::InvalidParameter(format!(
                "line delta must lie in (0, 90) degrees, got {}",
                delta_degrees
            )));
        }
        if log_tau.len() < 2 {
            return Err(lib_dsp::DspError::InsufficientData {
                needed: 2,
                got: log_tau.len(),
            }
            .into());
        }

        let rotation = Complex64::from_polar(1.0, delta_degrees.to_radians());
        let amplitude = log_tau
            .iter()
            .map(|&zeta| self.input_impedance(-rotation * (-zeta).exp()).im / PI)
            .collect();

        tracing::debug!(
            "distributed line: {} segments, spectrum on {} points, δ = {}°",
            self.len(),
            log_tau.len(),
            delta_degrees
        );
        Ok(TimeConstantSpectrum::new(log_tau.to_vec(), amplitude))
    }

    /// Cumulative structure sampled `points_per_segment` times per segment,
    /// starting at the origin.
    pub fn profile(&self, points_per_segment: usize) -> LineProfile {
        let steps = points_per_segment.max(1);
        let total_points = 1 + steps * self.len();

        let mut cumulative_resistance = Vec::with_capacity(total_points);
        let mut cumulative_capacitance = Vec::with_capacity(total_points);
        let mut position = Vec::with_capacity(total_points);
        let mut differential = Vec::with_capacity(total_points - 1);
        cumulative_resistance.push(0.0);
        cumulative_capacitance.push(0.0);
        position.push(0.0);

        let (mut r0, mut c0, mut x0) = (0.0, 0.0, 0.0);
        for ((&r, &c), &l) in self.resistance.iter().zip(self.capacitance.iter()).zip(self.length.iter()) {
            for k in 1..=steps {
                let f = k as f64 / steps as f64;
                cumulative_resistance.push(r0 + f * r);
                cumulative_capacitance.push(c0 + f * c);
                position.push(x0 + f * l);
                differential.push(c / r);
            }
            r0 += r;
            c0 += c;
            x0 += l;
        }

        LineProfile {
            structure: StructureFunction {
                cumulative_resistance,
                cumulative_capacitance,
                differential,
            },
            position,
        }
    }
}

/// `tanh` that stays finite for large real parts.
fn tanh_saturating(z: Complex64) -> Complex64 {
    if z.re.abs() > TANH_SATURATION {
        Complex64::new(z.re.signum(), 0.0)
    } else {
        z.tanh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_dsp::interpolation::linspace;

    fn three_segments() -> DistributedLadder {
        DistributedLadder::new(vec![0.5, 1.0, 2.0], vec![1e-3, 0.1, 5.0], None).unwrap()
    }

    #[test]
    fn test_dc_impedance_is_total_resistance() {
        let line = three_segments();
        let z = line.input_impedance(Complex64::new(1e-9, 0.0));
        assert!((z.re - 3.5).abs() < 1e-6, "Z = {}", z);
        assert!(z.im.abs() < 1e-9);
    }

    #[test]
    fn test_high_frequency_stays_finite() {
        let line = three_segments();
        let s = -Complex64::from_polar(1e12, 0.01);
        let z = line.input_impedance(s);
        assert!(z.re.is_finite() && z.im.is_finite(), "Z = {}", z);
        assert!(z.norm() < 1e-3);
    }

    #[test]
    fn test_single_line_spectrum() {
        // Slowest mode of a shorted RC line: τ = 4RC/π².
        let line = DistributedLadder::new(vec![2.0], vec![1.0], None).unwrap();
        let log_tau = linspace(-14.0, 8.0, 6000);
        let spectrum = line.time_constant_spectrum(&log_tau, DEFAULT_LINE_DELTA_DEGREES).unwrap();

        assert!(spectrum.amplitude.iter().all(|a| *a >= 0.0));
        let area = spectrum.total_resistance();
        assert!((area - 2.0).abs() < 0.01 * 2.0, "area = {}", area);

        let peak = spectrum
            .amplitude
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| log_tau[i])
            .unwrap();
        let slowest = (4.0 * 2.0 / (PI * PI)).ln();
        assert!((peak - slowest).abs() < 0.02, "peak at {}, expected {}", peak, slowest);
    }

    #[test]
    fn test_chain_spectrum_area() {
        let log_tau = linspace(-14.0, 8.0, 6000);
        let spectrum = three_segments().time_constant_spectrum(&log_tau, 0.5).unwrap();
        let area = spectrum.total_resistance();
        assert!((area - 3.5).abs() < 0.015 * 3.5, "area = {}", area);
    }

    #[test]
    fn test_profile_is_piecewise_linear() {
        let line = DistributedLadder::new(vec![1.0, 2.0], vec![0.5, 8.0], Some(vec![1e-3, 2e-3])).unwrap();
        let profile = line.profile(4);
        let structure = &profile.structure;

        assert_eq!(structure.len(), 9);
        assert_eq!(structure.differential.len(), 8);
        assert_eq!(structure.cumulative_resistance[0], 0.0);
        assert!((structure.cumulative_resistance[4] - 1.0).abs() < 1e-15);
        assert!((structure.cumulative_capacitance[8] - 8.5).abs() < 1e-12);
        assert!((profile.position[8] - 3e-3).abs() < 1e-15);
        assert!(structure.differential[..4].iter().all(|d| *d == 0.5));
        assert!(structure.differential[4..].iter().all(|d| *d == 4.0));
    }

    #[test]
    fn test_rejects_bad_segments() {
        assert!(DistributedLadder::new(vec![1.0], vec![1.0, 2.0], None).is_err());
        assert!(DistributedLadder::new(vec![], vec![], None).is_err());
        assert!(DistributedLadder::new(vec![1.0, -1.0], vec![1.0, 1.0], None).is_err());
        assert!(DistributedLadder::new(vec![1.0], vec![1.0], Some(vec![1.0, 2.0])).is_err());
        assert!(DistributedLadder::new(vec![1.0], vec![1.0], Some(vec![0.0])).is_err());

        let line = DistributedLadder::new(vec![1.0], vec![1.0], None).unwrap();
        assert!(line.time_constant_spectrum(&[0.0, 1.0], 0.0).is_err());
        assert!(line.time_constant_spectrum(&[0.0], 0.5).is_err());
    }
}
