//! Interpolation on strictly increasing abscissae.
//!
//! Linear interpolation clamps to the end values outside the sampled range.
//! The cubic spline uses natural boundary conditions and is solved with the
//! Thomas algorithm.

use crate::error::{DspError, DspResult};

/// `n` evenly spaced points from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            out[n - 1] = stop;
            out
        }
    }
}

fn check_abscissa(x: &[f64], y: &[f64]) -> DspResult<()> {
    if x.len() != y.len() {
        return Err(DspError::LengthMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    if x.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(DspError::InvalidParameter(
            "interpolation abscissa must be strictly increasing".into(),
        ));
    }
    Ok(())
}

/// Index `i` such that `x[i] <= target < x[i + 1]`, clamped to `[0, len − 2]`.
#[inline]
fn bracket(x: &[f64], target: f64) -> usize {
    let upper = x.partition_point(|&v| v <= target);
    upper.saturating_sub(1).min(x.len().saturating_sub(2))
}

/// Piecewise-linear interpolation of `(x, y)` at `targets`.
pub fn interpolate_linear(x: &[f64], y: &[f64], targets: &[f64]) -> DspResult<Vec<f64>> {
    check_abscissa(x, y)?;
    let n = x.len();

    Ok(targets
        .iter()
        .map(|&t| {
            if n == 1 || t <= x[0] {
                return y[0];
            }
            if t >= x[n - 1] {
                return y[n - 1];
            }
            let i = bracket(x, t);
            let frac = (t - x[i]) / (x[i + 1] - x[i]);
            y[i] + frac * (y[i + 1] - y[i])
        })
        .collect())
}

/// Solve a tridiagonal system with the Thomas algorithm.
///
/// `sub[0]` and `sup[n − 1]` are ignored. Returns `None` on a zero pivot.
pub fn thomas_solve(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    if n == 0 || diag[0] == 0.0 {
        return None;
    }

    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    c_prime[0] = sup[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];

    for i in 1..n {
        let den = diag[i] - sub[i] * c_prime[i - 1];
        if den == 0.0 {
            return None;
        }
        if i < n - 1 {
            c_prime[i] = sup[i] / den;
        }
        d_prime[i] = (rhs[i] - sub[i] * d_prime[i - 1]) / den;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }

    Some(x)
}

/// Natural cubic spline through `(x, y)`.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fit a natural spline. Needs at least 3 knots.
    pub fn new(x: &[f64], y: &[f64]) -> DspResult<Self> {
        check_abscissa(x, y)?;
        let n = x.len();
        if n < 3 {
            return Err(DspError::InsufficientData { needed: 3, got: n });
        }

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // Interior equations for m[1..n-1]; m[0] = m[n-1] = 0.
        let k = n - 2;
        let mut sub = vec![0.0; k];
        let mut diag = vec![0.0; k];
        let mut sup = vec![0.0; k];
        let mut rhs = vec![0.0; k];
        for j in 0..k {
            let i = j + 1;
            sub[j] = h[i - 1];
            diag[j] = 2.0 * (h[i - 1] + h[i]);
            sup[j] = h[i];
            rhs[j] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }

        let interior = thomas_solve(&sub, &diag, &sup, &rhs).ok_or_else(|| {
            DspError::NumericalInstability("singular spline system".into())
        })?;

        let mut m = vec![0.0; n];
        m[1..n - 1].copy_from_slice(&interior);

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Evaluate the spline; outside the knots the end cubic is extrapolated.
    pub fn eval(&self, t: f64) -> f64 {
        let i = bracket(&self.x, t);
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - t) / h;
        let b = (t - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }

    pub fn eval_many(&self, targets: &[f64]) -> Vec<f64> {
        targets.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Resample `(x, y)` onto `n` evenly spaced points spanning the same range.
///
/// Uses the cubic spline when at least 3 knots exist, else linear.
pub fn resample_uniform(x: &[f64], y: &[f64], n: usize) -> DspResult<(Vec<f64>, Vec<f64>)> {
    check_abscissa(x, y)?;
    let grid = linspace(x[0], x[x.len() - 1], n);
    let values = if x.len() >= 3 {
        CubicSpline::new(x, y)?.eval_many(&grid)
    } else {
        interpolate_linear(x, y, &grid)?
    };
    Ok((grid, values))
}
