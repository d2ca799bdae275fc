//! Adaptive local-regression derivative of the impedance curve.
//!
//! At every point of a uniform log-time grid a quadratic is fitted by ordinary
//! least squares to the samples within a window of half-length `L`. The
//! fitted constant is the smoothed impedance and the linear coefficient is
//! `dZ/d ln t`. After each fit `L` is adapted for the next point: it shrinks
//! when the residual variance exceeds the expected noise variance and grows
//! otherwise, always within `[min_length, max_length]`. The window is also
//! widened until it holds at least `min_points` samples.
//!
//! The derivative is returned on a padded copy of the grid, extended with
//! zeros on both sides so the subsequent circular deconvolution does not wrap.

use crate::error::{DspError, DspResult};
use crate::interpolation::{interpolate_linear, linspace};
use lib_types::LogTimeCurve;
use nalgebra::{Matrix3, Vector3};

/// Window control for [`estimate_derivative`].
#[derive(Clone, Debug, PartialEq)]
pub struct DerivativeConfig {
    /// Smallest window half-length (log-time units).
    pub min_length: f64,

    /// Largest window half-length (log-time units).
    pub max_length: f64,

    /// Step by which the half-length grows or shrinks.
    pub increment: f64,

    /// Minimum number of samples inside a window.
    pub min_points: usize,

    /// Expected noise variance, in percent² of the total impedance rise.
    pub expected_var: f64,

    /// Leading samples skipped before the grid starts.
    pub min_index: usize,

    /// Number of points on the interpolation grid.
    pub grid_size: usize,

    /// Zero padding before the grid, as a fraction of `grid_size`.
    pub pad_pre: f64,

    /// Zero padding after the grid, as a fraction of `grid_size`.
    pub pad_after: f64,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            min_length: 0.35,
            max_length: 3.0,
            increment: 0.1,
            min_points: 70,
            expected_var: 0.09,
            min_index: 3,
            grid_size: 250,
            pad_pre: 0.01,
            pad_after: 0.01,
        }
    }
}

/// Output of the derivative stage.
#[derive(Clone, Debug)]
pub struct DerivativeEstimate {
    /// Uniform interpolation grid (ln t).
    pub log_time: Vec<f64>,

    /// Smoothed impedance on `log_time`.
    pub smoothed: Vec<f64>,

    /// `dZ/d ln t` on `log_time`.
    pub derivative: Vec<f64>,

    /// Window half-length used at each point of `log_time`.
    pub window: Vec<f64>,

    /// `log_time` extended by `pad_pre`/`pad_after` samples.
    pub padded_log_time: Vec<f64>,

    /// `derivative` with zero padding, aligned with `padded_log_time`.
    pub padded_derivative: Vec<f64>,

    /// Uniform grid spacing.
    pub delta: f64,

    /// Number of zero samples prepended.
    pub pad_pre: usize,

    /// Number of zero samples appended.
    pub pad_after: usize,
}

impl DerivativeEstimate {
    #[inline]
    pub fn padded_len(&self) -> usize {
        self.padded_log_time.len()
    }
}

/// One local fit: smoothed value and slope at the window center.
struct LocalFit {
    value: f64,
    slope: f64,
    residual_var: f64,
}

/// Quadratic least squares in the scaled coordinate `u = (x − center)/scale`.
fn fit_quadratic(x: &[f64], y: &[f64], center: f64, scale: f64) -> Option<LocalFit> {
    let n = x.len();
    if n < 4 || scale <= 0.0 {
        return None;
    }

    let mut ata = Matrix3::<f64>::zeros();
    let mut aty = Vector3::<f64>::zeros();
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let u = (xi - center) / scale;
        let row = Vector3::new(1.0, u, u * u);
        ata += row * row.transpose();
        aty += row * yi;
    }

    let coeffs = ata.lu().solve(&aty)?;
    if !coeffs.iter().all(|c| c.is_finite()) {
        return None;
    }

    let ssr: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| {
            let u = (xi - center) / scale;
            let r = yi - (coeffs[0] + coeffs[1] * u + coeffs[2] * u * u);
            r * r
        })
        .sum();

    Some(LocalFit {
        value: coeffs[0],
        slope: coeffs[1] / scale,
        residual_var: ssr / (n - 3) as f64,
    })
}

/// Estimate the smoothed impedance and its log-time derivative.
pub fn estimate_derivative(
    curve: &LogTimeCurve,
    config: &DerivativeConfig,
) -> DspResult<DerivativeEstimate> {
    let n = curve.len();
    if curve.impedance.len() != n {
        return Err(DspError::LengthMismatch {
            expected: n,
            actual: curve.impedance.len(),
        });
    }
    if n < config.min_index + 2 {
        return Err(DspError::InsufficientData {
            needed: config.min_index + 2,
            got: n,
        });
    }
    if config.grid_size < 2 {
        return Err(DspError::InvalidParameter(format!(
            "derivative grid needs at least 2 points, got {}",
            config.grid_size
        )));
    }
    if !(config.min_length > 0.0 && config.min_length <= config.max_length) {
        return Err(DspError::InvalidParameter(format!(
            "window bounds must satisfy 0 < min <= max, got {}..{}",
            config.min_length, config.max_length
        )));
    }

    let x = &curve.log_time;
    let z = &curve.impedance;

    let grid = linspace(x[config.min_index], x[n - 1], config.grid_size);
    let delta = grid[1] - grid[0];

    let span = curve.impedance_span();
    let threshold = config.expected_var * (span / 100.0).powi(2);
    let increment = config.increment.max(0.0);

    let mut smoothed = Vec::with_capacity(grid.len());
    let mut derivative = Vec::with_capacity(grid.len());
    let mut window = Vec::with_capacity(grid.len());
    let mut half_length = config.min_length;
    let mut degenerate = 0usize;
    let mut last_slope = 0.0;

    for &center in &grid {
        let mut lo = x.partition_point(|&v| v < center - half_length);
        let mut hi = x.partition_point(|&v| v <= center + half_length);

        // Widen until enough samples fall inside.
        while hi - lo < config.min_points && half_length < config.max_length && increment > 0.0 {
            half_length = (half_length + increment).min(config.max_length);
            lo = x.partition_point(|&v| v < center - half_length);
            hi = x.partition_point(|&v| v <= center + half_length);
        }
        window.push(half_length);

        match fit_quadratic(&x[lo..hi], &z[lo..hi], center, half_length) {
            Some(fit) => {
                smoothed.push(fit.value);
                derivative.push(fit.slope);
                last_slope = fit.slope;

                half_length = if fit.residual_var > threshold {
                    (half_length - increment).max(config.min_length)
                } else {
                    (half_length + increment).min(config.max_length)
                };
            }
            None => {
                degenerate += 1;
                let value = interpolate_linear(x, z, &[center])?;
                smoothed.push(value[0]);
                derivative.push(last_slope);
            }
        }
    }

    if degenerate > 0 {
        tracing::debug!(
            "derivative: {} of {} local fits degenerate, previous slope reused",
            degenerate,
            grid.len()
        );
    }

    // Rounding noise from fitting a flat curve is not a derivative.
    let scale = z.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let floor = 1e-12 * scale;
    if derivative.iter().all(|d| d.abs() <= floor) {
        return Err(DspError::EmptyDerivative);
    }
    if derivative.iter().any(|d| !d.is_finite()) {
        return Err(DspError::NumericalInstability(
            "non-finite impedance derivative".into(),
        ));
    }

    let pad_pre = (config.pad_pre * config.grid_size as f64).round() as usize;
    let pad_after = (config.pad_after * config.grid_size as f64).round() as usize;
    let total = pad_pre + grid.len() + pad_after;

    let start = grid[0] - pad_pre as f64 * delta;
    let padded_log_time: Vec<f64> = (0..total).map(|k| start + k as f64 * delta).collect();

    let mut padded_derivative = vec![0.0; total];
    padded_derivative[pad_pre..pad_pre + grid.len()].copy_from_slice(&derivative);

    tracing::debug!(
        "derivative: grid {} points (+{}/+{} padding), delta = {:.4}",
        grid.len(),
        pad_pre,
        pad_after,
        delta
    );

    Ok(DerivativeEstimate {
        log_time: grid,
        smoothed,
        derivative,
        window,
        padded_log_time,
        padded_derivative,
        delta,
        pad_pre,
        pad_after,
    })
}
