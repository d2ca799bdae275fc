//! Polynomials in arbitrary precision and the rational impedance of a
//! Foster network.
//!
//! Coefficients are stored in ascending order: `p[k]` multiplies `sᵏ`.

use crate::precision::{Precision, Real};

/// `a · b`.
pub fn poly_mul(a: &[Real], b: &[Real], precision: Precision) -> Vec<Real> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![precision.zero(); a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] = &out[i + j] + &(x * y);
        }
    }
    out
}

/// `a · b` keeping only the terms below `s^max_order`.
pub fn poly_mul_truncated(a: &[Real], b: &[Real], max_order: usize, precision: Precision) -> Vec<Real> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let len = (a.len() + b.len() - 1).min(max_order);
    let mut out = vec![precision.zero(); len];
    for (i, x) in a.iter().enumerate().take(len) {
        for (j, y) in b.iter().enumerate().take(len - i) {
            out[i + j] = &out[i + j] + &(x * y);
        }
    }
    out
}

/// `a + b`, padded to the longer length.
pub fn poly_add(a: &[Real], b: &[Real], precision: Precision) -> Vec<Real> {
    let len = a.len().max(b.len());
    let zero = precision.zero();
    (0..len)
        .map(|k| {
            let x = a.get(k).unwrap_or(&zero);
            let y = b.get(k).unwrap_or(&zero);
            x + y
        })
        .collect()
}

/// `a · s^shift`.
pub fn poly_shift(a: &[Real], shift: usize, precision: Precision) -> Vec<Real> {
    let mut out = vec![precision.zero(); shift];
    out.extend(a.iter().cloned());
    out
}

/// Horner evaluation.
pub fn poly_eval(p: &[Real], x: &Real, precision: Precision) -> Real {
    p.iter()
        .rev()
        .fold(precision.zero(), |acc, c| &(&acc * x) + c)
}

/// `Z(s) = N(s) / D(s)` of a Foster network.
#[derive(Clone, Debug)]
pub struct RationalImpedance {
    /// Degree `n − 1`.
    pub numerator: Vec<Real>,

    /// Degree `n`, constant term 1.
    pub denominator: Vec<Real>,
}

impl RationalImpedance {
    /// Sum the pairs one at a time:
    /// `N ← N·(1 + sτ) + R·D`, `D ← D·(1 + sτ)`.
    pub fn from_foster(resistance: &[Real], capacitance: &[Real], precision: Precision) -> Self {
        let mut numerator: Vec<Real> = Vec::new();
        let mut denominator = vec![precision.one()];

        for (r, c) in resistance.iter().zip(capacitance.iter()) {
            let factor = [precision.one(), r * c];
            let scaled: Vec<Real> = denominator.iter().map(|d| r * d).collect();
            numerator = poly_add(&poly_mul(&numerator, &factor, precision), &scaled, precision);
            denominator = poly_mul(&denominator, &factor, precision);
        }

        Self {
            numerator,
            denominator,
        }
    }

    /// Number of poles.
    pub fn order(&self) -> usize {
        self.denominator.len().saturating_sub(1)
    }

    pub fn evaluate(&self, s: &Real, precision: Precision) -> Real {
        &poly_eval(&self.numerator, s, precision) / &poly_eval(&self.denominator, s, precision)
    }

    /// Descending-order coefficients normalized by the leading denominator
    /// coefficient, both of length `n + 1`. The numerator is padded with a
    /// leading zero so `Z = num / den` still holds term by term.
    pub fn monic_descending(&self, precision: Precision) -> Option<(Vec<Real>, Vec<Real>)> {
        let lead = self.denominator.last()?;
        let inv = crate::precision::checked_div(&precision.one(), lead)?;

        let den: Vec<Real> = self.denominator.iter().rev().map(|d| d * &inv).collect();
        let mut num = vec![precision.zero()];
        num.extend(self.numerator.iter().rev().map(|c| c * &inv));
        num.resize(den.len(), precision.zero());
        Some((num, den))
    }
}
