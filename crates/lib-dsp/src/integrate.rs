//! Cumulative integration on sampled grids.

/// Cumulative trapezoidal integral of `y` over `x`, starting at 0.
///
/// The output has the same length as the input. Mismatched lengths are
/// truncated to the shorter one.
pub fn cumulative_trapezoid(y: &[f64], x: &[f64]) -> Vec<f64> {
    let n = y.len().min(x.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }

    let mut acc = 0.0;
    out.push(acc);
    for i in 1..n {
        acc += 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]);
        out.push(acc);
    }
    out
}

/// Cumulative trapezoidal integral on a uniform grid with spacing `dx`.
pub fn cumulative_trapezoid_uniform(y: &[f64], dx: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(y.len());
    let mut acc = 0.0;
    for (i, &v) in y.iter().enumerate() {
        if i > 0 {
            acc += 0.5 * (v + y[i - 1]) * dx;
        }
        out.push(acc);
    }
    out
}
