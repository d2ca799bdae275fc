//! Cumulative and differential structure functions.

use lib_types::CauerNetwork;

/// Cumulative capacitance above which points are dropped for display.
pub const DEFAULT_DISPLAY_CAPACITANCE_LIMIT: f64 = 1e4;

/// One point of the structure function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StructureRow {
    pub cumulative_resistance: f64,
    pub cumulative_capacitance: f64,
    pub differential: Option<f64>,
}

/// Running sums of a Cauer ladder, heat source first.
#[derive(Clone, Debug, PartialEq)]
pub struct StructureFunction {
    /// `Σ R[0..=i]`
    pub cumulative_resistance: Vec<f64>,

    /// `Σ C[0..=i]`
    pub cumulative_capacitance: Vec<f64>,

    /// `ΔC/ΔR` between consecutive points, length `N − 1`.
    pub differential: Vec<f64>,
}

impl StructureFunction {
    pub fn from_cauer(network: &CauerNetwork) -> Self {
        let cumulative_resistance = running_sum(&network.resistance);
        let cumulative_capacitance = running_sum(&network.capacitance);
        let differential = differential(&cumulative_resistance, &cumulative_capacitance);

        Self {
            cumulative_resistance,
            cumulative_capacitance,
            differential,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cumulative_resistance.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cumulative_resistance.is_empty()
    }

    /// Leading points whose cumulative capacitance stays within `limit`.
    pub fn truncated(&self, limit: f64) -> Self {
        let keep = self
            .cumulative_capacitance
            .iter()
            .position(|&c| !(c <= limit))
            .unwrap_or(self.len());

        Self {
            cumulative_resistance: self.cumulative_resistance[..keep].to_vec(),
            cumulative_capacitance: self.cumulative_capacitance[..keep].to_vec(),
            differential: self.differential[..keep.saturating_sub(1)].to_vec(),
        }
    }

    /// `(R_cum, C_cum, dC/dR)` rows; the last row has no differential.
    pub fn rows(&self) -> impl Iterator<Item = StructureRow> + '_ {
        (0..self.len()).map(move |i| StructureRow {
            cumulative_resistance: self.cumulative_resistance[i],
            cumulative_capacitance: self.cumulative_capacitance[i],
            differential: self.differential.get(i).copied(),
        })
    }
}

fn running_sum(values: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    values
        .iter()
        .map(|v| {
            acc += v;
            acc
        })
        .collect()
}

/// Zero where two cumulative resistances coincide.
fn differential(resistance: &[f64], capacitance: &[f64]) -> Vec<f64> {
    resistance
        .windows(2)
        .zip(capacitance.windows(2))
        .map(|(r, c)| {
            let dr = r[0] - r[1];
            if dr == 0.0 {
                0.0
            } else {
                (c[0] - c[1]) / dr
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> CauerNetwork {
        CauerNetwork::new(vec![0.1, 0.7, 0.0, 2.3, 1e-3], vec![1e-4, 3e-3, 0.2, -1e-5, 50.0]).unwrap()
    }

    #[test]
    fn test_cumulative_sums_are_exact() {
        let network = ladder();
        let sf = StructureFunction::from_cauer(&network);
        assert_eq!(sf.len(), network.len());
        for i in 0..network.len() {
            let r: f64 = network.resistance[..=i].iter().sum();
            let c: f64 = network.capacitance[..=i].iter().sum();
            assert_eq!(sf.cumulative_resistance[i], r);
            assert_eq!(sf.cumulative_capacitance[i], c);
        }
        assert_eq!(sf.differential.len(), network.len() - 1);
    }

    #[test]
    fn test_differential_guards_zero_step() {
        let sf = StructureFunction::from_cauer(&ladder());
        // Rung 2 has R = 0.
        assert_eq!(sf.differential[1], 0.0);
        assert!((sf.differential[0] - 3e-3 / 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_empty_and_single() {
        let empty = StructureFunction::from_cauer(&CauerNetwork::new(vec![], vec![]).unwrap());
        assert!(empty.is_empty());
        assert!(empty.differential.is_empty());

        let one = StructureFunction::from_cauer(&CauerNetwork::new(vec![1.0], vec![2.0]).unwrap());
        assert_eq!(one.len(), 1);
        assert!(one.differential.is_empty());
    }

    #[test]
    fn test_truncated_at_capacitance_limit() {
        let sf = StructureFunction::from_cauer(&ladder());
        let cut = sf.truncated(1.0);
        assert_eq!(cut.len(), 4);
        assert_eq!(cut.differential.len(), 3);
        assert_eq!(sf.truncated(1e9), sf);
        assert!(sf.truncated(1e-9).is_empty());
    }

    #[test]
    fn test_rows() {
        let sf = StructureFunction::from_cauer(&ladder());
        let rows: Vec<_> = sf.rows().collect();
        assert_eq!(rows.len(), 5);
        assert!(rows[4].differential.is_none());
        assert_eq!(rows[0].cumulative_resistance, 0.1);
    }
}
