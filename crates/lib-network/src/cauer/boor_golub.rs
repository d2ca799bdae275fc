//! Boor–Golub reconstruction.
//!
//! The same discrete inner product as the Lanczos recursion, but the
//! orthogonal polynomials are carried as coefficient arrays and evaluated at
//! the decay rates `pᵢ = −poleᵢ` for every weighted inner product. The
//! recurrence coefficients are split into the continued-fraction pair
//! `(λₖ, μₖ)`,
//!
//! ```text
//! λ₀ = α₀,  μₖ = βₖ / λ_{k−1},  λₖ = αₖ − μₖ
//! ```
//!
//! which read off the ladder as `Rₖ = 1/(λₖ Cₖ)` and `C_{k+1} = 1/(Rₖ μ_{k+1})`,
//! starting from `C₀ = 1/Σwᵢ`.

use super::{rates_and_weights, Ladder};
use crate::polynomial::{poly_add, poly_eval, poly_shift};
use crate::precision::{checked_div, is_zero, Precision, Real};

fn scaled(p: &[Real], factor: &Real) -> Vec<Real> {
    p.iter().map(|c| factor * c).collect()
}

fn negated(x: &Real, precision: Precision) -> Real {
    &precision.zero() - x
}

pub fn boor_golub(resistance: &[Real], capacitance: &[Real], precision: Precision) -> Ladder {
    let n = resistance.len();
    let mut ladder = Ladder::with_capacity(n);
    if n == 0 {
        return ladder;
    }

    let one = precision.one();
    let Some((rates, weights)) = rates_and_weights(resistance, capacitance, precision) else {
        ladder.breakdown("boor-golub", 0);
        return ladder;
    };

    let inner = |f: &[Real], g: &[Real]| -> Real {
        rates
            .iter()
            .zip(weights.iter())
            .fold(precision.zero(), |acc, (x, w)| {
                let fx = poly_eval(f, x, precision);
                let gx = poly_eval(g, x, precision);
                &acc + &(&(w * &fx) * &gx)
            })
    };

    let total_weight = weights.iter().fold(precision.zero(), |acc, w| &acc + w);
    let Some(mut cap) = checked_div(&one, &total_weight) else {
        ladder.breakdown("boor-golub", 0);
        return ladder;
    };

    let mut previous: Vec<Real> = Vec::new();
    let mut current: Vec<Real> = vec![one.clone()];
    let mut norm = inner(&current, &current);
    let mut prev_norm = precision.zero();
    let mut mu = precision.zero();

    for k in 0..n {
        let x_current = poly_shift(&current, 1, precision);
        let Some(alpha) = checked_div(&inner(&x_current, &current), &norm) else {
            ladder.breakdown("boor-golub", k);
            break;
        };

        let lambda = &alpha - &mu;
        let Some(res) = checked_div(&one, &(&lambda * &cap)) else {
            ladder.breakdown("boor-golub", k);
            break;
        };
        ladder.push(res.clone(), cap.clone());

        if k + 1 == n {
            break;
        }

        // π_{k+1} = (x − αₖ) πₖ − βₖ π_{k−1}
        let mut next = poly_add(&x_current, &scaled(&current, &negated(&alpha, precision)), precision);
        if k > 0 {
            let beta = &norm / &prev_norm;
            next = poly_add(&next, &scaled(&previous, &negated(&beta, precision)), precision);
        }

        let next_norm = inner(&next, &next);
        if is_zero(&next_norm) {
            ladder.breakdown("boor-golub", k + 1);
            break;
        }

        let beta_next = &next_norm / &norm;
        let Some(next_mu) = checked_div(&beta_next, &lambda) else {
            ladder.breakdown("boor-golub", k + 1);
            break;
        };
        let Some(next_cap) = checked_div(&one, &(&res * &next_mu)) else {
            ladder.breakdown("boor-golub", k + 1);
            break;
        };

        previous = std::mem::replace(&mut current, next);
        prev_norm = std::mem::replace(&mut norm, next_norm);
        mu = next_mu;
        cap = next_cap;
    }

    ladder
}
