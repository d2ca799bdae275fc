//! Regularized-regression deconvolution.
//!
//! The smoothed impedance is regressed on exponential step responses
//!
//! ```text
//! Z(tᵢ) ≈ b + Σⱼ Rⱼ · (1 − exp(−tᵢ/τⱼ)),     Rⱼ ≥ 0
//! ```
//!
//! with an L1 penalty on `R`. Columns are centered (the intercept `b` is not
//! penalized) and scaled to unit norm before solving by cyclic coordinate
//! descent; coefficients are rescaled afterwards. The penalty is fixed or
//! chosen by K-fold cross-validation over a log-spaced path, with the folds
//! evaluated in parallel. In hybrid mode each coefficient's penalty is
//! weighted by the inverse of a Bayesian prior spectrum, so time constants the
//! prior supports are penalized less.

use super::bayesian::{bayesian_deconvolve, response_matrix};
use crate::derivative::DerivativeEstimate;
use crate::error::{DspError, DspResult};
use crate::interpolation::{interpolate_linear, linspace};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

/// Floor added to the normalized prior before inverting it into weights.
const PRIOR_FLOOR: f64 = 1e-3;

/// Smallest penalty on the cross-validation path, relative to `alpha_max`.
const ALPHA_PATH_RATIO: f64 = 1e-3;

/// Candidate time constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TauGrid {
    /// One candidate per padded derivative grid point.
    Aligned,

    /// `count` log-spaced candidates over the padded grid range.
    LogSpaced { count: usize },
}

/// Penalty selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Penalty {
    /// Fixed penalty strength.
    Fixed(f64),

    /// K-fold cross-validation over `alphas` log-spaced penalties.
    CrossValidated { folds: usize, alphas: usize },
}

/// Lasso deconvolution settings.
#[derive(Clone, Debug, PartialEq)]
pub struct LassoConfig {
    pub tau_grid: TauGrid,
    pub penalty: Penalty,

    /// Weight penalties by a Bayesian prior spectrum.
    pub hybrid: bool,

    /// Richardson–Lucy steps for the hybrid prior.
    pub prior_steps: usize,

    /// Maximum coordinate-descent sweeps.
    pub max_iter: usize,

    /// Relative coefficient change below which a sweep counts as converged.
    pub tolerance: f64,
}

impl Default for LassoConfig {
    fn default() -> Self {
        Self {
            tau_grid: TauGrid::Aligned,
            penalty: Penalty::CrossValidated {
                folds: 5,
                alphas: 20,
            },
            hybrid: false,
            prior_steps: 1000,
            max_iter: 2000,
            tolerance: 1e-4,
        }
    }
}

/// Centered, column-normalized regression problem.
struct Design {
    x: Array2<f64>,
    y: Array1<f64>,
    norms: Vec<f64>,
}

impl Design {
    fn build(log_time: &[f64], target: &[f64], log_tau: &[f64]) -> Self {
        let m = log_time.len();
        let p = log_tau.len();

        let mut x = Array2::from_shape_fn((m, p), |(i, j)| {
            1.0 - (-(log_time[i] - log_tau[j]).exp()).exp()
        });

        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        let mut norms = vec![0.0; p];
        for (j, mut column) in x.axis_iter_mut(Axis(1)).enumerate() {
            column -= means[j];
            let norm = column.dot(&column).sqrt();
            // Columns flat over the measured window carry no information.
            if norm > 1e-12 {
                column /= norm;
                norms[j] = norm;
            } else {
                column.fill(0.0);
            }
        }

        let y_mean = target.iter().sum::<f64>() / m.max(1) as f64;
        let y = Array1::from_iter(target.iter().map(|v| v - y_mean));

        Self { x, y, norms }
    }
}

struct Fit {
    beta: Vec<f64>,
    sweeps: usize,
    converged: bool,
}

/// Non-negative weighted lasso by cyclic coordinate descent.
///
/// Minimizes `(1/2m)‖y − Xβ‖² + α Σ wⱼ βⱼ` subject to `β ≥ 0`.
fn coordinate_descent(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    alpha: f64,
    weights: &[f64],
    warm_start: Option<&[f64]>,
    max_iter: usize,
    tolerance: f64,
) -> Fit {
    let (m, p) = x.dim();
    let col_sq: Vec<f64> = x.axis_iter(Axis(1)).map(|c| c.dot(&c)).collect();

    let mut beta = warm_start.map(|b| b.to_vec()).unwrap_or_else(|| vec![0.0; p]);
    let mut residual = y.to_owned() - x.dot(&Array1::from(beta.clone()));
    let threshold_scale = m as f64 * alpha;

    let mut sweeps = 0;
    let mut converged = false;
    while sweeps < max_iter {
        sweeps += 1;
        let mut max_change = 0.0f64;
        let mut max_beta = 0.0f64;

        for j in 0..p {
            if col_sq[j] == 0.0 {
                continue;
            }
            let column = x.column(j);
            let old = beta[j];
            let rho = column.dot(&residual) + col_sq[j] * old;
            let new = (rho - threshold_scale * weights[j]).max(0.0) / col_sq[j];

            if new != old {
                residual.scaled_add(old - new, &column);
                beta[j] = new;
            }
            max_change = max_change.max((new - old).abs());
            max_beta = max_beta.max(new.abs());
        }

        if max_beta == 0.0 || max_change <= tolerance * max_beta {
            converged = true;
            break;
        }
    }

    Fit {
        beta,
        sweeps,
        converged,
    }
}

/// Smallest penalty that keeps every coefficient at zero.
fn alpha_max(x: ArrayView2<f64>, y: ArrayView1<f64>, weights: &[f64]) -> f64 {
    let m = x.nrows() as f64;
    x.axis_iter(Axis(1))
        .zip(weights.iter())
        .map(|(c, &w)| c.dot(&y) / (m * w))
        .fold(0.0, f64::max)
}

/// Mean held-out squared error for each penalty on the path.
fn cross_validate(design: &Design, weights: &[f64], alphas: &[f64], folds: usize, config: &LassoConfig) -> Vec<f64> {
    let m = design.y.len();

    let fold_errors: Vec<Vec<f64>> = (0..folds)
        .into_par_iter()
        .map(|k| {
            let train: Vec<usize> = (0..m).filter(|i| i % folds != k).collect();
            let test: Vec<usize> = (0..m).filter(|i| i % folds == k).collect();

            let x_train = design.x.select(Axis(0), &train);
            let y_train = design.y.select(Axis(0), &train);
            let x_test = design.x.select(Axis(0), &test);
            let y_test = design.y.select(Axis(0), &test);

            let mut warm: Option<Vec<f64>> = None;
            alphas
                .iter()
                .map(|&alpha| {
                    let fit = coordinate_descent(
                        x_train.view(),
                        y_train.view(),
                        alpha,
                        weights,
                        warm.as_deref(),
                        config.max_iter,
                        config.tolerance,
                    );
                    let predicted = x_test.dot(&Array1::from(fit.beta.clone()));
                    let error = (&y_test - &predicted).mapv(|r| r * r).mean().unwrap_or(0.0);
                    warm = Some(fit.beta);
                    error
                })
                .collect()
        })
        .collect();

    (0..alphas.len())
        .map(|a| fold_errors.iter().map(|e| e[a]).sum::<f64>() / folds as f64)
        .collect()
}

/// Deconvolve by non-negative lasso regression; returns the resistance
/// density on the padded derivative grid.
pub fn lasso_deconvolve(estimate: &DerivativeEstimate, config: &LassoConfig) -> DspResult<Vec<f64>> {
    let padded = &estimate.padded_log_time;
    if padded.len() < 2 || estimate.log_time.len() < 2 {
        return Err(DspError::InsufficientData {
            needed: 2,
            got: estimate.log_time.len().min(padded.len()),
        });
    }

    let log_tau = match config.tau_grid {
        TauGrid::Aligned => padded.clone(),
        TauGrid::LogSpaced { count } => {
            if count < 2 {
                return Err(DspError::InvalidParameter(format!(
                    "log-spaced tau grid needs at least 2 points, got {}",
                    count
                )));
            }
            linspace(padded[0], padded[padded.len() - 1], count)
        }
    };
    let tau_spacing = log_tau[1] - log_tau[0];

    let design = Design::build(&estimate.log_time, &estimate.smoothed, &log_tau);

    let weights: Vec<f64> = if config.hybrid {
        let matrix = response_matrix(padded.len(), estimate.delta);
        let prior = bayesian_deconvolve(&matrix, &estimate.padded_derivative, config.prior_steps)?;
        let prior_on_tau = interpolate_linear(padded, &prior, &log_tau)?;
        let peak = prior_on_tau.iter().copied().fold(0.0, f64::max);
        prior_on_tau
            .iter()
            .map(|&v| {
                let normalized = if peak > 0.0 { v.max(0.0) / peak } else { 0.0 };
                1.0 / (normalized + PRIOR_FLOOR)
            })
            .collect()
    } else {
        vec![1.0; log_tau.len()]
    };

    let alpha = match config.penalty {
        Penalty::Fixed(alpha) => {
            if !(alpha >= 0.0) {
                return Err(DspError::InvalidParameter(format!(
                    "lasso penalty must be non-negative, got {}",
                    alpha
                )));
            }
            alpha
        }
        Penalty::CrossValidated { folds, alphas } => {
            if folds < 2 || alphas < 1 {
                return Err(DspError::InvalidParameter(format!(
                    "cross-validation needs >= 2 folds and >= 1 penalty, got {} and {}",
                    folds, alphas
                )));
            }
            let a_max = alpha_max(design.x.view(), design.y.view(), &weights);
            if a_max <= 0.0 {
                return Err(DspError::NoActiveCoefficients);
            }
            let path: Vec<f64> = linspace(0.0, ALPHA_PATH_RATIO.log10(), alphas)
                .into_iter()
                .map(|e| a_max * 10f64.powf(e))
                .collect();
            let errors = cross_validate(&design, &weights, &path, folds, config);
            let best = errors
                .iter()
                .enumerate()
                .fold((0, f64::INFINITY), |acc, (i, &e)| if e < acc.1 { (i, e) } else { acc })
                .0;
            tracing::debug!(
                "lasso: cross-validated alpha = {:.3e} ({} of {}, alpha_max = {:.3e})",
                path[best],
                best + 1,
                alphas,
                a_max
            );
            path[best]
        }
    };

    let fit = coordinate_descent(
        design.x.view(),
        design.y.view(),
        alpha,
        &weights,
        None,
        config.max_iter,
        config.tolerance,
    );

    if !fit.converged {
        tracing::warn!(
            "lasso: coordinate descent did not converge in {} sweeps (alpha = {:.3e}); \
             consider a larger penalty or more iterations",
            fit.sweeps,
            alpha
        );
    }

    let resistance: Vec<f64> = fit
        .beta
        .iter()
        .zip(design.norms.iter())
        .map(|(&b, &norm)| if norm > 0.0 { b / norm } else { 0.0 })
        .collect();

    let active = resistance.iter().filter(|&&r| r > 0.0).count();
    if active == 0 {
        return Err(DspError::NoActiveCoefficients);
    }

    tracing::debug!(
        "lasso: {} of {} coefficients active after {} sweeps",
        active,
        resistance.len(),
        fit.sweeps
    );

    let density: Vec<f64> = resistance.iter().map(|r| r / tau_spacing).collect();

    match config.tau_grid {
        TauGrid::Aligned => Ok(density),
        TauGrid::LogSpaced { .. } => interpolate_linear(&log_tau, &density, padded),
    }
}
