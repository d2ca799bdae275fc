//! Lumped RC networks.
//!
//! Both network forms store parallel `resistance`/`capacitance` vectors of
//! equal length. In a [`FosterNetwork`] the order only mirrors the spectrum
//! sampling. In a [`CauerNetwork`] index 0 is the rung nearest the heat source.

use crate::units::{JoulesPerKelvin, KelvinPerWatt, Seconds};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resistance and capacitance vectors of unequal length.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("RC network: {resistances} resistances but {capacitances} capacitances")]
pub struct NetworkShapeError {
    pub resistances: usize,
    pub capacitances: usize,
}

fn check_shape(resistance: &[f64], capacitance: &[f64]) -> Result<(), NetworkShapeError> {
    if resistance.len() != capacitance.len() {
        return Err(NetworkShapeError {
            resistances: resistance.len(),
            capacitances: capacitance.len(),
        });
    }
    Ok(())
}

/// Parallel RC pairs: `Z(s) = Σ Rᵢ / (1 + s Rᵢ Cᵢ)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FosterNetwork {
    pub resistance: Vec<f64>,
    pub capacitance: Vec<f64>,
}

impl FosterNetwork {
    pub fn new(resistance: Vec<f64>, capacitance: Vec<f64>) -> Result<Self, NetworkShapeError> {
        check_shape(&resistance, &capacitance)?;
        Ok(Self {
            resistance,
            capacitance,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resistance.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resistance.is_empty()
    }

    /// Iterate over `(R, C)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (KelvinPerWatt, JoulesPerKelvin)> + '_ {
        self.resistance
            .iter()
            .zip(self.capacitance.iter())
            .map(|(&r, &c)| (KelvinPerWatt(r), JoulesPerKelvin(c)))
    }

    /// Time constant `τᵢ = Rᵢ Cᵢ` of each pair.
    pub fn time_constants(&self) -> Vec<Seconds> {
        self.pairs().map(|(r, c)| r.time_constant(c)).collect()
    }

    /// Steady-state thermal resistance.
    pub fn total_resistance(&self) -> KelvinPerWatt {
        KelvinPerWatt(self.resistance.iter().sum())
    }

    /// Step response `Z(t) = Σ Rᵢ (1 − e^{−t/τᵢ})`.
    pub fn impedance_at(&self, t: Seconds) -> KelvinPerWatt {
        let z = self
            .pairs()
            .map(|(r, c)| {
                let tau = r.time_constant(c).0;
                if tau > 0.0 {
                    r.0 * (1.0 - (-t.0 / tau).exp())
                } else {
                    r.0
                }
            })
            .sum();
        KelvinPerWatt(z)
    }
}

/// Serial RC ladder, ordered from the heat source outward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CauerNetwork {
    pub resistance: Vec<f64>,
    pub capacitance: Vec<f64>,
}

impl CauerNetwork {
    pub fn new(resistance: Vec<f64>, capacitance: Vec<f64>) -> Result<Self, NetworkShapeError> {
        check_shape(&resistance, &capacitance)?;
        Ok(Self {
            resistance,
            capacitance,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resistance.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resistance.is_empty()
    }

    pub fn total_resistance(&self) -> KelvinPerWatt {
        KelvinPerWatt(self.resistance.iter().sum())
    }

    pub fn total_capacitance(&self) -> JoulesPerKelvin {
        JoulesPerKelvin(self.capacitance.iter().sum())
    }

    /// Number of negative resistances plus negative capacitances.
    ///
    /// Negative elements mark numerical breakdown deep in the ladder.
    pub fn negative_count(&self) -> usize {
        self.resistance
            .iter()
            .chain(self.capacitance.iter())
            .filter(|&&v| v < 0.0)
            .count()
    }

    /// Index of the first rung with a negative (or non-finite) element.
    pub fn first_invalid_rung(&self) -> Option<usize> {
        self.resistance
            .iter()
            .zip(self.capacitance.iter())
            .position(|(&r, &c)| !(r >= 0.0 && c >= 0.0 && r.is_finite() && c.is_finite()))
    }

    /// Merge consecutive rungs in blocks of `width`.
    ///
    /// Blocks start at multiples of `width`; the trailing partial block is
    /// folded into the last full block. Ladders shorter than one block and
    /// widths below 2 are returned unchanged.
    pub fn blockwise_sum(&self, width: usize) -> Self {
        let n_blocks = if width > 1 { self.len() / width } else { 0 };
        if n_blocks == 0 {
            return self.clone();
        }

        let block_sum = |values: &[f64]| -> Vec<f64> {
            (0..n_blocks)
                .map(|b| {
                    let start = b * width;
                    let end = if b + 1 == n_blocks { values.len() } else { start + width };
                    values[start..end].iter().sum()
                })
                .collect()
        };

        Self {
            resistance: block_sum(&self.resistance),
            capacitance: block_sum(&self.capacitance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch() {
        let err = FosterNetwork::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert_eq!(err.resistances, 2);
        assert_eq!(err.capacitances, 1);
        assert!(CauerNetwork::new(vec![], vec![1.0]).is_err());
    }

    #[test]
    fn test_foster_step_response() {
        let foster = FosterNetwork::new(vec![2.0, 3.0], vec![0.5, 1e-3]).unwrap();
        let taus = foster.time_constants();
        assert!((taus[0].0 - 1.0).abs() < 1e-15);
        assert!((taus[1].0 - 3e-3).abs() < 1e-15);

        // Far past every time constant the response is the total resistance.
        let z_inf = foster.impedance_at(Seconds(1e3));
        assert!((z_inf.0 - foster.total_resistance().0).abs() < 1e-12);

        let z1 = foster.impedance_at(Seconds(1.0));
        let expected = 2.0 * (1.0 - (-1.0f64).exp()) + 3.0 * (1.0 - (-1.0 / 3e-3f64).exp());
        assert!((z1.0 - expected).abs() < 1e-12);
    }

    #[test]
    fn test_negative_count() {
        let cauer = CauerNetwork::new(vec![1.0, -0.5, 2.0], vec![1.0, 2.0, -1.0]).unwrap();
        assert_eq!(cauer.negative_count(), 2);
        assert_eq!(cauer.first_invalid_rung(), Some(1));
    }

    #[test]
    fn test_blockwise_sum_folds_remainder() {
        let r: Vec<f64> = (1..=7).map(|v| v as f64).collect();
        let c = vec![1.0; 7];
        let cauer = CauerNetwork::new(r, c).unwrap();

        let merged = cauer.blockwise_sum(3);
        assert_eq!(merged.resistance, vec![1.0 + 2.0 + 3.0, 4.0 + 5.0 + 6.0 + 7.0]);
        assert_eq!(merged.capacitance, vec![3.0, 4.0]);
        assert!((merged.total_resistance().0 - cauer.total_resistance().0).abs() < 1e-12);
    }

    #[test]
    fn test_blockwise_sum_passthrough() {
        let cauer = CauerNetwork::new(vec![1.0, 2.0], vec![3.0, 4.0]).unwrap();
        assert_eq!(cauer.blockwise_sum(1), cauer);
        assert_eq!(cauer.blockwise_sum(5), cauer);
    }
}
