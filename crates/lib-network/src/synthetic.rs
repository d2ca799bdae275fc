//! Cauer → Foster conversion and synthetic transients.
//!
//! A ladder with node capacitances `Cₖ` and series resistances `Rₖ` (the last
//! one to ambient) obeys `(sC + G)·T = P·e₀` with tridiagonal conductance `G`.
//! With `A = C^{-1/2} G C^{-1/2} = V Λ Vᵀ`,
//!
//! ```text
//! Z(s) = (1/C₀) Σᵢ V₀ᵢ² / (s + λᵢ)
//! ```
//!
//! so every eigenpair is one Foster pair: `τᵢ = 1/λᵢ`, `Rᵢ = V₀ᵢ²/(C₀ λᵢ)`.

use crate::error::{NetworkError, NetworkResult};
use lib_types::{CauerNetwork, FosterNetwork, Seconds, TimeConstantSpectrum};
use nalgebra::{DMatrix, SymmetricEigen};

pub fn cauer_to_foster(ladder: &CauerNetwork) -> NetworkResult<FosterNetwork> {
    let n = ladder.len();
    if n == 0 {
        return Err(NetworkError::EmptyNetwork);
    }
    for (index, (&r, &c)) in ladder.resistance.iter().zip(ladder.capacitance.iter()).enumerate() {
        if !(r > 0.0 && c > 0.0 && r.is_finite() && c.is_finite()) {
            return Err(NetworkError::InvalidElement {
                index,
                resistance: r,
                capacitance: c,
            });
        }
    }

    let g = |k: usize| 1.0 / ladder.resistance[k];
    let scale: Vec<f64> = ladder.capacitance.iter().map(|c| 1.0 / c.sqrt()).collect();

    let mut a = DMatrix::<f64>::zeros(n, n);
    for k in 0..n {
        let upstream = if k > 0 { g(k - 1) } else { 0.0 };
        a[(k, k)] = (upstream + g(k)) * scale[k] * scale[k];
        if k + 1 < n {
            let off = -g(k) * scale[k] * scale[k + 1];
            a[(k, k + 1)] = off;
            a[(k + 1, k)] = off;
        }
    }

    let eigen = SymmetricEigen::new(a);

    let mut pairs: Vec<(f64, f64)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &lambda)| {
            let v0 = eigen.eigenvectors[(0, i)];
            let r = v0 * v0 / (ladder.capacitance[0] * lambda);
            let tau = 1.0 / lambda;
            (r, tau / r)
        })
        .collect();
    // Fastest pole first.
    pairs.sort_by(|x, y| (x.0 * x.1).total_cmp(&(y.0 * y.1)));

    let (resistance, capacitance) = pairs.into_iter().unzip();
    Ok(FosterNetwork::new(resistance, capacitance)?)
}

/// Step response of a ladder sampled on a log-time grid.
#[derive(Clone, Debug)]
pub struct SyntheticTransient {
    pub time: Vec<f64>,
    pub impedance: Vec<f64>,
    pub foster: FosterNetwork,
}

/// `Z(t) = Σ Rᵢ (1 − e^{−t/τᵢ})` at `t = exp(log_time)`.
pub fn synthetic_transient(ladder: &CauerNetwork, log_time: &[f64]) -> NetworkResult<SyntheticTransient> {
    let foster = cauer_to_foster(ladder)?;
    let time: Vec<f64> = log_time.iter().map(|x| x.exp()).collect();
    let impedance = time.iter().map(|&t| foster.impedance_at(Seconds(t)).0).collect();

    tracing::debug!(
        "synthetic transient: {} rungs, {} samples, Z(∞) = {:.4}",
        ladder.len(),
        time.len(),
        foster.total_resistance().0
    );

    Ok(SyntheticTransient {
        time,
        impedance,
        foster,
    })
}

/// Discrete spectrum of a Foster network on a uniform `ln τ` grid.
///
/// Each pair deposits `R/Δ` at the nearest grid point; pairs outside the grid
/// are dropped.
pub fn discrete_spectrum(foster: &FosterNetwork, log_tau: &[f64]) -> TimeConstantSpectrum {
    let mut amplitude = vec![0.0; log_tau.len()];
    if log_tau.len() >= 2 {
        let delta = log_tau[1] - log_tau[0];
        for (r, tau) in foster.resistance.iter().zip(foster.time_constants()) {
            let position = ((tau.ln() - log_tau[0]) / delta).round();
            if position >= 0.0 && (position as usize) < log_tau.len() {
                amplitude[position as usize] += r / delta;
            }
        }
    }
    TimeConstantSpectrum::new(log_tau.to_vec(), amplitude)
}
