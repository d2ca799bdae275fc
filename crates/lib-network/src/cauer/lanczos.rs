//! Lanczos-type recursion on the Foster poles.
//!
//! `Z(s) = Σ wᵢ/(s + pᵢ)` with decay rates `pᵢ = 1/(RᵢCᵢ)` and weights
//! `wᵢ = 1/Cᵢ` defines a discrete inner product `⟨f, g⟩ = Σ wᵢ f(pᵢ) g(pᵢ)`.
//! The three-term recurrence of its monic orthogonal polynomials, carried as
//! value vectors on the nodes,
//!
//! ```text
//! π₀ = 1,  π_{k+1} = (x − αₖ) πₖ − βₖ π_{k−1}
//! αₖ = ⟨x πₖ, πₖ⟩ / ⟨πₖ, πₖ⟩,  βₖ = ⟨πₖ, πₖ⟩ / ⟨π_{k−1}, π_{k−1}⟩
//! ```
//!
//! yields the Jacobi matrix of the ladder directly. Each new vector is
//! re-orthogonalized against all earlier ones; without it the recurrence
//! drifts for poles spread over many decades and returns a plausible but
//! wrong ladder.
//!
//!
//! ```text
//! C₀ = 1 / Σwᵢ
//! 1/Rₖ = αₖ Cₖ − 1/R_{k−1}
//! C_{k+1} = (1/Rₖ)² / (Cₖ β_{k+1})
//! ```

use super::{rates_and_weights, Ladder};
use crate::precision::{checked_div, is_zero, Precision, Real};

pub fn lanczos(resistance: &[Real], capacitance: &[Real], precision: Precision) -> Ladder {
    let n = resistance.len();
    let mut ladder = Ladder::with_capacity(n);
    if n == 0 {
        return ladder;
    }

    let one = precision.one();
    let Some((rates, weights)) = rates_and_weights(resistance, capacitance, precision) else {
        ladder.breakdown("lanczos", 0);
        return ladder;
    };

    let inner = |f: &[Real], g: &[Real], scale_by_rate: bool| -> Real {
        (0..n).fold(precision.zero(), |acc, i| {
            let mut term = &(&weights[i] * &f[i]) * &g[i];
            if scale_by_rate {
                term = &term * &rates[i];
            }
            &acc + &term
        })
    };

    let total_weight = weights.iter().fold(precision.zero(), |acc, w| &acc + w);
    let Some(mut cap) = checked_div(&one, &total_weight) else {
        ladder.breakdown("lanczos", 0);
        return ladder;
    };

    let mut previous: Vec<Real> = vec![precision.zero(); n];
    let mut current: Vec<Real> = vec![one.clone(); n];
    let mut norm = inner(&current, &current, false);
    let mut beta = precision.zero();
    let mut prev_conductance = precision.zero();
    let mut basis: Vec<(Vec<Real>, Real)> = Vec::with_capacity(n);

    for k in 0..n {
        let Some(alpha) = checked_div(&inner(&current, &current, true), &norm) else {
            ladder.breakdown("lanczos", k);
            break;
        };

        let conductance = &(&alpha * &cap) - &prev_conductance;
        let Some(res) = checked_div(&one, &conductance) else {
            ladder.breakdown("lanczos", k);
            break;
        };
        ladder.push(res, cap.clone());

        if k + 1 == n {
            break;
        }

        let mut next: Vec<Real> = (0..n)
            .map(|i| {
                let shifted = &(&rates[i] - &alpha) * &current[i];
                &shifted - &(&beta * &previous[i])
            })
            .collect();
        basis.push((current.clone(), norm.clone()));
        for (vector, vector_norm) in &basis {
            let projection = &inner(&next, vector, false) / vector_norm;
            for (x, v) in next.iter_mut().zip(vector.iter()) {
                *x = &*x - &(&projection * v);
            }
        }
        let next_norm = inner(&next, &next, false);
        if is_zero(&next_norm) {
            ladder.breakdown("lanczos", k + 1);
            break;
        }

        beta = &next_norm / &norm;
        let Some(next_cap) = checked_div(&(&conductance * &conductance), &(&cap * &beta)) else {
            ladder.breakdown("lanczos", k + 1);
            break;
        };

        previous = std::mem::replace(&mut current, next);
        norm = next_norm;
        cap = next_cap;
        prev_conductance = conductance;
    }

    ladder
}
