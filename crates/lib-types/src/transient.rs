//! Thermal transient curves.
//!
//! A [`TransientCurve`] is the measured (or simulated) thermal impedance after a
//! single power step. All downstream stages work in logarithmic time, so the
//! curve is converted once into a [`LogTimeCurve`].
//!
//! # Invariants
//!
//! - time is strictly increasing and positive
//! - every sample is finite
//!
//! Impedance is expected to be monotonically non-decreasing. Violations point
//! at measurement problems; they are counted and logged, never corrected.

use crate::units::{Celsius, KelvinPerWatt, Seconds, Watts};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of samples below which results are flagged as unreliable.
pub const RECOMMENDED_MIN_SAMPLES: usize = 100;

/// Errors raised while ingesting a transient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransientError {
    /// Time and value columns differ in length.
    #[error("transient input: time has {time} samples but values have {values}")]
    LengthMismatch { time: usize, values: usize },

    /// Fewer than two samples.
    #[error("transient input: need at least 2 samples, got {0}")]
    TooShort(usize),

    /// Time axis is not strictly increasing.
    #[error("transient input: time is not strictly increasing at index {index} ({prev} >= {next})")]
    NonIncreasingTime { index: usize, prev: f64, next: f64 },

    /// Logarithmic time needs t > 0.
    #[error("transient input: time must be positive for log-time analysis, got {time} at index {index}")]
    NonPositiveTime { index: usize, time: f64 },

    /// NaN or infinity in the input.
    #[error("transient input: non-finite value at index {0}")]
    NonFinite(usize),

    /// Effective heating power is zero or negative.
    #[error("transient input: effective power step must be positive, got {0} W")]
    NonPositivePower(f64),
}

/// Power step description used to convert temperatures to impedance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerStep {
    /// Electrical power step (sign is ignored).
    pub power: Watts,

    /// Power leaving the device as light (LEDs), subtracted from the step.
    #[serde(default)]
    pub optical_power: Watts,

    /// Additional calibration scale applied to the effective power.
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Heating transients rise; cooling transients fall.
    #[serde(default)]
    pub is_heating: bool,
}

fn default_scale() -> f64 {
    1.0
}

impl PowerStep {
    /// Effective power that produced the temperature change.
    pub fn effective(&self) -> Watts {
        Watts((self.power.0.abs() - self.optical_power.0) * self.scale)
    }
}

/// Thermal impedance versus time after a power step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransientCurve {
    time: Vec<f64>,
    impedance: Vec<f64>,
}

impl TransientCurve {
    /// Create a curve from time (s) and impedance (K/W) columns.
    pub fn new(time: Vec<f64>, impedance: Vec<f64>) -> Result<Self, TransientError> {
        if time.len() != impedance.len() {
            return Err(TransientError::LengthMismatch {
                time: time.len(),
                values: impedance.len(),
            });
        }
        if time.len() < 2 {
            return Err(TransientError::TooShort(time.len()));
        }

        for (i, (&t, &z)) in time.iter().zip(impedance.iter()).enumerate() {
            if !t.is_finite() || !z.is_finite() {
                return Err(TransientError::NonFinite(i));
            }
            if t <= 0.0 {
                return Err(TransientError::NonPositiveTime { index: i, time: t });
            }
        }

        if let Some(i) = time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(TransientError::NonIncreasingTime {
                index: i + 1,
                prev: time[i],
                next: time[i + 1],
            });
        }

        if time.len() < RECOMMENDED_MIN_SAMPLES {
            tracing::warn!(
                "Data length ({}) is shorter than recommended minimum ({} points). Results may be unreliable.",
                time.len(),
                RECOMMENDED_MIN_SAMPLES
            );
        }

        let curve = Self { time, impedance };
        let violations = curve.monotonicity_violations();
        if violations > 0 {
            tracing::warn!(
                "Impedance decreases at {} of {} steps; check measurement noise or transient polarity",
                violations,
                curve.len() - 1
            );
        }

        Ok(curve)
    }

    /// Convert a temperature transient into thermal impedance.
    ///
    /// `Z = (T0 - T) / P_eff` for cooling transients, negated for heating.
    pub fn from_temperature(
        time: Vec<f64>,
        temperature: &[Celsius],
        t_zero: Celsius,
        step: &PowerStep,
    ) -> Result<Self, TransientError> {
        let p_eff = step.effective();
        if p_eff.0 <= 0.0 {
            return Err(TransientError::NonPositivePower(p_eff.0));
        }

        let impedance = temperature
            .iter()
            .map(|&t| {
                let z: KelvinPerWatt = (t_zero - t) / p_eff;
                if step.is_heating {
                    -z.0
                } else {
                    z.0
                }
            })
            .collect();

        Self::new(time, impedance)
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Always false for a constructed curve; provided for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time axis in seconds.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Impedance values in K/W.
    pub fn impedance(&self) -> &[f64] {
        &self.impedance
    }

    /// Time span of the measurement.
    pub fn span(&self) -> (Seconds, Seconds) {
        (Seconds(self.time[0]), Seconds(self.time[self.time.len() - 1]))
    }

    /// Final (steady-state) impedance.
    pub fn final_impedance(&self) -> KelvinPerWatt {
        KelvinPerWatt(self.impedance[self.impedance.len() - 1])
    }

    /// Count of steps where the impedance decreases.
    pub fn monotonicity_violations(&self) -> usize {
        self.impedance.windows(2).filter(|w| w[1] < w[0]).count()
    }

    /// Convert to the logarithmic-time representation.
    pub fn to_log_time(&self) -> LogTimeCurve {
        LogTimeCurve {
            log_time: self.time.iter().map(|t| t.ln()).collect(),
            impedance: self.impedance.clone(),
        }
    }
}

/// Impedance sampled against `ln(t)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogTimeCurve {
    /// Strictly increasing natural-log time.
    pub log_time: Vec<f64>,

    /// Impedance in K/W.
    pub impedance: Vec<f64>,
}

impl LogTimeCurve {
    #[inline]
    pub fn len(&self) -> usize {
        self.log_time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.log_time.is_empty()
    }

    /// Total impedance rise across the curve.
    pub fn impedance_span(&self) -> f64 {
        let (min, max) = self
            .impedance
            .iter()
            .fold((f64::MAX, f64::MIN), |(min, max), &v| (min.min(v), max.max(v)));
        max - min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_spaced(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1e-6 * 10f64.powf(i as f64 * 6.0 / (n - 1) as f64)).collect()
    }

    #[test]
    fn test_valid_curve() {
        let time = log_spaced(200);
        let imp: Vec<f64> = time.iter().map(|t| 1.0 - (-t / 1e-3).exp()).collect();
        let curve = TransientCurve::new(time, imp).unwrap();
        assert_eq!(curve.len(), 200);
        assert_eq!(curve.monotonicity_violations(), 0);

        let log_curve = curve.to_log_time();
        assert!(log_curve.log_time.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_rejects_non_increasing_time() {
        let result = TransientCurve::new(vec![1e-6, 2e-6, 2e-6], vec![0.0, 0.1, 0.2]);
        assert!(matches!(
            result,
            Err(TransientError::NonIncreasingTime { index: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_time() {
        let result = TransientCurve::new(vec![0.0, 1e-6], vec![0.0, 0.1]);
        assert!(matches!(result, Err(TransientError::NonPositiveTime { index: 0, .. })));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let result = TransientCurve::new(vec![1.0, 2.0], vec![0.0]);
        assert!(matches!(result, Err(TransientError::LengthMismatch { .. })));
    }

    #[test]
    fn test_short_input_is_accepted() {
        // Below the recommended length: warning only.
        let time = log_spaced(20);
        let imp: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!(TransientCurve::new(time, imp).is_ok());
    }

    #[test]
    fn test_non_monotonic_is_flagged_not_corrected() {
        let curve = TransientCurve::new(vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 0.2, 0.1, 0.3]).unwrap();
        assert_eq!(curve.monotonicity_violations(), 1);
        assert_eq!(curve.impedance()[2], 0.1);
    }

    #[test]
    fn test_from_temperature_cooling() {
        let step = PowerStep {
            power: Watts(-2.0),
            optical_power: Watts(0.0),
            scale: 1.0,
            is_heating: false,
        };
        let temps = [Celsius(80.0), Celsius(70.0), Celsius(60.0)];
        let curve =
            TransientCurve::from_temperature(vec![1e-3, 2e-3, 3e-3], &temps, Celsius(80.0), &step)
                .unwrap();
        assert_eq!(curve.impedance(), &[0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_from_temperature_heating_with_optical_power() {
        let step = PowerStep {
            power: Watts(3.0),
            optical_power: Watts(1.0),
            scale: 1.0,
            is_heating: true,
        };
        let temps = [Celsius(25.0), Celsius(35.0)];
        let curve =
            TransientCurve::from_temperature(vec![1.0, 2.0], &temps, Celsius(25.0), &step).unwrap();
        assert!((curve.impedance()[1] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_temperature_rejects_zero_power() {
        let step = PowerStep {
            power: Watts(1.0),
            optical_power: Watts(1.0),
            scale: 1.0,
            is_heating: true,
        };
        let result = TransientCurve::from_temperature(
            vec![1.0, 2.0],
            &[Celsius(0.0), Celsius(1.0)],
            Celsius(0.0),
            &step,
        );
        assert!(matches!(result, Err(TransientError::NonPositivePower(_))));
    }
}
