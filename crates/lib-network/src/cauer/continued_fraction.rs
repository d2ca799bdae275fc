//! Continued-fraction (J-fraction) expansions: Khatwani and Sobhy.
//!
//! Both start from the impedance in descending powers, normalized so the
//! denominator is monic,
//!
//! ```text
//! Z(s) = (0·sⁿ + b₁sⁿ⁻¹ + … + bₙ) / (sⁿ + a₁sⁿ⁻¹ + … + aₙ)
//! ```
//!
//! and produce the coefficient pairs `(Hᵢ, hᵢ)` of a J-fraction, which
//! [`ladder_from_j_fraction`] turns into Cauer rungs. Khatwani reaches them
//! through the Markov parameters (the expansion of `Z` at infinity) and a
//! Routh-like tableau; Sobhy runs a two-row tableau directly on the
//! coefficients.

use super::Ladder;
use crate::polynomial::{poly_add, poly_mul, poly_mul_truncated, poly_shift};
use crate::precision::{checked_div, Precision, Real};

/// J-fraction coefficients, possibly cut short by a zero pivot.
#[derive(Clone, Debug)]
pub struct JFraction {
    pub large: Vec<Real>,
    pub small: Vec<Real>,
    pub breakdown: Option<usize>,
}

fn negated(p: &[Real], precision: Precision) -> Vec<Real> {
    let zero = precision.zero();
    p.iter().map(|c| &zero - c).collect()
}

/// First `2n` Markov parameters of `num/den` (`n = den.len()`).
///
/// `1/den` is expanded by Newton-style squaring of the error term, doubling
/// the valid order each round.
pub fn markov_parameters(num: &[Real], den: &[Real], precision: Precision) -> Vec<Real> {
    let n = den.len();
    let max_order = 2 * n;
    let rounds = n.next_power_of_two().trailing_zeros() as usize + 1;

    let mut term = vec![precision.one()];
    let mut error: Vec<Real> = den.iter().skip(1).cloned().collect();
    let mut shift = 1;

    for _ in 0..rounds {
        let correction = poly_mul_truncated(&error, &poly_shift(&term, shift, precision), max_order, precision);
        let next_term = poly_add(&term, &negated(&correction, precision), precision);
        let next_error = negated(&poly_mul_truncated(&error, &error, max_order, precision), precision);
        term = next_term;
        error = next_error;
        shift *= 2;
    }

    let product = poly_mul(num, &term, precision);
    (1..=max_order)
        .map(|k| product.get(k).cloned().unwrap_or_else(|| precision.zero()))
        .collect()
}

/// Khatwani's tableau on the Markov parameters.
pub fn khatwani(num: &[Real], den: &[Real], precision: Precision) -> JFraction {
    let n = den.len();
    let width = 2 * n;
    let mut fraction = JFraction {
        large: Vec::with_capacity(n.saturating_sub(1)),
        small: Vec::with_capacity(n.saturating_sub(1)),
        breakdown: None,
    };
    if n < 2 {
        return fraction;
    }

    let mut row0 = vec![precision.zero(); width];
    row0[0] = precision.one();
    let row1 = markov_parameters(num, den, precision);

    let (Some(large), Some(small)) = pivot(&row0, &row1) else {
        fraction.breakdown = Some(0);
        return fraction;
    };
    fraction.large.push(large);
    fraction.small.push(small);

    let mut older = row0;
    let mut newer = row1;
    for i in 2..n {
        let big = &fraction.large[i - 2];
        let little = &fraction.small[i - 2];
        let mut row = vec![precision.zero(); width];
        for j in 0..width - 2 * (i - 1) {
            let t = &(big * &newer[j + 2]) + &(little * &newer[j + 1]);
            row[j] = &older[j + 2] - &t;
        }

        let (Some(large), Some(small)) = pivot(&newer, &row) else {
            fraction.breakdown = Some(i - 1);
            break;
        };
        fraction.large.push(large);
        fraction.small.push(small);
        older = std::mem::replace(&mut newer, row);
    }

    fraction
}

/// `H = upper[0]/lower[0]`, `h = (upper[1] − H·lower[1])/lower[0]`.
fn pivot(upper: &[Real], lower: &[Real]) -> (Option<Real>, Option<Real>) {
    let Some(large) = checked_div(&upper[0], &lower[0]) else {
        return (None, None);
    };
    let small = checked_div(&(&upper[1] - &(&large * &lower[1])), &lower[0]);
    (Some(large), small)
}

/// Sobhy's two-row tableau on the normalized coefficients.
pub fn sobhy(num: &[Real], den: &[Real], precision: Precision) -> JFraction {
    let n = den.len();
    let mut fraction = JFraction {
        large: Vec::with_capacity(n.saturating_sub(1)),
        small: Vec::with_capacity(n.saturating_sub(1)),
        breakdown: None,
    };
    if n < 2 {
        return fraction;
    }

    let row = |f: &dyn Fn(usize) -> Real, len: usize| -> Vec<Real> {
        (0..n)
            .map(|k| if k < len { f(k) } else { precision.zero() })
            .collect()
    };

    let a_prev = den.to_vec();
    let a_cur = row(&|k| num[k + 1].clone(), n - 1);
    let Some(ratio) = checked_div(&a_prev[0], &a_cur[0]) else {
        fraction.breakdown = Some(0);
        return fraction;
    };
    let b_cur = row(&|k| &a_prev[k + 1] - &(&ratio * &a_cur[k + 1]), n - 1);
    let Some(small) = checked_div(&b_cur[0], &a_cur[0]) else {
        fraction.breakdown = Some(0);
        return fraction;
    };
    fraction.large.push(ratio);
    fraction.small.push(small);

    let (mut a_prev, mut b_prev) = (a_cur, b_cur);
    for j in 2..n {
        // a_prev[0] is non-zero: it was a divisor in the previous step.
        let ratio_b = &b_prev[0] / &a_prev[0];
        let a_cur = row(&|k| &b_prev[k + 1] - &(&ratio_b * &a_prev[k + 1]), n - j);

        let Some(ratio_a) = checked_div(&a_prev[0], &a_cur[0]) else {
            fraction.breakdown = Some(j - 1);
            break;
        };
        let b_cur = row(&|k| &a_prev[k + 1] - &(&ratio_a * &a_cur[k + 1]), n - j);
        let small = &b_cur[0] / &a_cur[0];

        fraction.large.push(ratio_a);
        fraction.small.push(small);
        a_prev = a_cur;
        b_prev = b_cur;
    }

    fraction
}

/// Convert `(Hᵢ, hᵢ)` into Cauer rungs.
///
/// ```text
/// a²₀ = 1/H₀,  b₀ = −h₀/H₀,  a²ᵢ = −1/(Hᵢ H_{i−1}),  bᵢ = −hᵢ/Hᵢ
/// c₀ = 1/a²₀,  c₁ = −a²₀/b₀
/// c_{2i}   = 1 / (c_{2i−2} c²_{2i−1} a²ᵢ)
/// c_{2i+1} = −c_{2i−1} / (1 + c_{2i} c_{2i−1} bᵢ)
/// ```
///
/// with `Cᵢ = c_{2i}` and `Rᵢ = c_{2i+1}`.
pub fn ladder_from_j_fraction(method: &'static str, fraction: &JFraction, precision: Precision) -> Ladder {
    let pairs = fraction.large.len().min(fraction.small.len());
    let mut ladder = Ladder::with_capacity(pairs);
    let one = precision.one();
    let zero = precision.zero();

    let mut prev_cap = zero.clone();
    let mut prev_res = zero.clone();

    for i in 0..pairs {
        let large = &fraction.large[i];
        let a_square = if i == 0 {
            checked_div(&one, large)
        } else {
            checked_div(&one, &(large * &fraction.large[i - 1])).map(|v| &zero - &v)
        };
        let b = checked_div(&fraction.small[i], large).map(|v| &zero - &v);

        let rung = match (a_square, b) {
            (Some(a_square), Some(b)) if i == 0 => checked_div(&one, &a_square)
                .zip(checked_div(&(&zero - &a_square), &b)),
            (Some(a_square), Some(b)) => {
                let cap = checked_div(&one, &(&(&(&prev_cap * &prev_res) * &prev_res) * &a_square));
                cap.and_then(|cap| {
                    let denom = &one + &(&(&cap * &prev_res) * &b);
                    checked_div(&(&zero - &prev_res), &denom).map(|res| (cap, res))
                })
            }
            _ => None,
        };

        let Some((cap, res)) = rung else {
            ladder.breakdown(method, i);
            return ladder;
        };
        ladder.push(res.clone(), cap.clone());
        prev_cap = cap;
        prev_res = res;
    }

    if let Some(step) = fraction.breakdown {
        ladder.breakdown(method, step);
    }
    ladder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::RationalImpedance;
    use crate::precision::to_f64;

    fn normalized(resistance: &[f64], capacitance: &[f64], p: Precision) -> (Vec<Real>, Vec<Real>) {
        RationalImpedance::from_foster(&p.reals(resistance).unwrap(), &p.reals(capacitance).unwrap(), p)
            .monic_descending(p)
            .unwrap()
    }

    #[test]
    fn test_markov_parameters_of_single_pole() {
        // 2/(1 + s) = 2/s − 2/s² + 2/s³ − …
        let p = Precision::default();
        let (num, den) = normalized(&[2.0], &[0.5], p);
        let markov: Vec<f64> = markov_parameters(&num, &den, p).iter().map(to_f64).collect();
        assert_eq!(markov, vec![2.0, -2.0, 2.0, -2.0]);
    }

    #[test]
    fn test_both_tableaux_give_the_same_ladder() {
        let p = Precision::default();
        let (num, den) = normalized(&[1.0, 1.0], &[1.0, 0.5], p);
        let expected = [(1.8, 1.0 / 3.0), (0.2, 25.0 / 6.0)];

        for (name, fraction) in [("khatwani", khatwani(&num, &den, p)), ("sobhy", sobhy(&num, &den, p))] {
            assert!(fraction.breakdown.is_none(), "{}", name);
            let ladder = ladder_from_j_fraction(name, &fraction, p);
            assert_eq!(ladder.len(), 2, "{}", name);
            for (k, (r, c)) in expected.iter().enumerate() {
                assert!((to_f64(&ladder.resistance[k]) - r).abs() < 1e-13, "{} R[{}]", name, k);
                assert!((to_f64(&ladder.capacitance[k]) - c).abs() < 1e-13, "{} C[{}]", name, k);
            }
        }
    }

    #[test]
    fn test_coincident_poles_truncate() {
        // Two identical pairs are one pole of 2/(1 + s).
        let p = Precision::default();
        let (num, den) = normalized(&[1.0, 1.0], &[1.0, 1.0], p);
        let fraction = sobhy(&num, &den, p);
        assert_eq!(fraction.breakdown, Some(1));

        let ladder = ladder_from_j_fraction("sobhy", &fraction, p);
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder.truncated_at, Some(1));
        assert!((to_f64(&ladder.resistance[0]) - 2.0).abs() < 1e-14);
        assert!((to_f64(&ladder.capacitance[0]) - 0.5).abs() < 1e-14);
    }
}
