//! Bayesian (Richardson–Lucy) deconvolution.
//!
//! The multiplicative update keeps the sign of the starting estimate, so a
//! non-negative start yields a non-negative spectrum after any number of
//! steps. There is no convergence check: the configured number of steps
//! always runs to completion.

use super::weight_kernel;
use crate::error::{DspError, DspResult};
use ndarray::{Array1, Array2};

/// Response matrix `A[i][j] = w((i − j)·δ)·δ` on a uniform `n`-point grid.
pub fn response_matrix(n: usize, delta: f64) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(i, j)| {
        weight_kernel((i as f64 - j as f64) * delta) * delta
    })
}

/// Run `steps` Richardson–Lucy iterations of `derivative ≈ A · spectrum`.
///
/// Negative derivative samples (noise) are clipped to zero before iterating.
pub fn bayesian_deconvolve(
    matrix: &Array2<f64>,
    derivative: &[f64],
    steps: usize,
) -> DspResult<Vec<f64>> {
    let n = derivative.len();
    if matrix.nrows() != n || matrix.ncols() != n {
        return Err(DspError::LengthMismatch {
            expected: n,
            actual: matrix.nrows(),
        });
    }

    let data = Array1::from_iter(derivative.iter().map(|&d| d.max(0.0)));
    let column_sums = matrix.sum_axis(ndarray::Axis(0));

    let mut estimate = data.clone();

    for _ in 0..steps {
        let predicted = matrix.dot(&estimate);
        let ratio = Array1::from_iter(data.iter().zip(predicted.iter()).map(|(&d, &p)| {
            if p > 0.0 {
                d / p
            } else {
                0.0
            }
        }));
        let correction = matrix.t().dot(&ratio);

        estimate.zip_mut_with(&correction, |s, &c| {
            *s = s.max(0.0) * c;
        });
        estimate.zip_mut_with(&column_sums, |s, &norm| {
            *s = if norm > 0.0 { *s / norm } else { 0.0 };
        });
    }

    tracing::debug!("bayesian deconvolution: {} steps on {} samples", steps, n);

    Ok(estimate.to_vec())
}
