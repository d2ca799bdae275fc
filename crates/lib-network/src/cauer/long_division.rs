//! Cauer synthesis by repeated polynomial long division.
//!
//! With `Y = 1/Z = D/N` (deg D = deg N + 1) each step peels one rung:
//!
//! ```text
//! C  = lead(D) / lead(N)        D' = D − C·s·N
//! R  = lead(N) / lead(D')       N' = N − R·D'
//! ```
//!
//! and continues on `D'/N'`, one degree lower.

use super::Ladder;
use crate::polynomial::RationalImpedance;
use crate::precision::checked_div;

pub fn long_division(z: &RationalImpedance) -> Ladder {
    let mut ladder = Ladder::with_capacity(z.order());
    let mut num = z.numerator.clone();
    let mut den = z.denominator.clone();

    while !num.is_empty() && den.len() == num.len() + 1 {
        let step = ladder.len();

        let (Some(n_lead), Some(d_lead)) = (num.last(), den.last()) else {
            break;
        };
        let Some(cap) = checked_div(d_lead, n_lead) else {
            ladder.breakdown("long division", step);
            break;
        };

        // The leading term cancels exactly; drop it.
        let reduced_den: Vec<_> = (0..den.len() - 1)
            .map(|k| {
                if k == 0 {
                    den[0].clone()
                } else {
                    &den[k] - &(&cap * &num[k - 1])
                }
            })
            .collect();

        let Some(res) = reduced_den.last().and_then(|lead| checked_div(n_lead, lead)) else {
            ladder.breakdown("long division", step);
            break;
        };

        let reduced_num: Vec<_> = (0..num.len() - 1)
            .map(|k| &num[k] - &(&res * &reduced_den[k]))
            .collect();

        ladder.push(res, cap);
        num = reduced_num;
        den = reduced_den;
    }

    ladder
}
