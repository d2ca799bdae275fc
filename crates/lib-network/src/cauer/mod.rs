//! Foster → Cauer synthesis.
//!
//! The Foster impedance `Z(s) = Σ Rᵢ/(1 + sRᵢCᵢ)` is expanded into the ladder
//!
//! ```text
//! Z(s) = 1 / (sC₀ + 1 / (R₀ + 1 / (sC₁ + 1 / (R₁ + …))))
//! ```
//!
//! by one of five interchangeable algorithms, all in arbitrary precision. The
//! expansion is a Euclidean algorithm and loses digits quickly as the ladder
//! grows, so negative elements deep in the ladder are expected at low
//! precision. They are reported, never corrected. An exact zero pivot ends
//! the ladder early.

pub mod boor_golub;
pub mod continued_fraction;
pub mod lanczos;
pub mod long_division;

use crate::error::{NetworkError, NetworkResult};
use crate::foster::{merge_coincident_poles, DEFAULT_MERGE_TOLERANCE};
use crate::polynomial::RationalImpedance;
use crate::precision::{checked_div, to_f64_vec, Precision, Real};
use lib_types::{CauerNetwork, FosterNetwork};

/// Default Lanczos block width.
pub const DEFAULT_BLOCKWISE_SUM_WIDTH: usize = 20;

/// Synthesis algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CauerMethod {
    /// Repeated long division of the admittance polynomials.
    PolynomialLongDivision,

    /// Three-term recurrence on the poles; rungs optionally merged in blocks.
    Lanczos { blockwise_sum_width: usize },

    /// Recurrence on polynomial coefficient arrays.
    BoorGolub,

    /// Markov parameters and a Routh-like tableau.
    Khatwani,

    /// Two-row tableau on the normalized coefficients.
    #[default]
    Sobhy,
}

impl CauerMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PolynomialLongDivision => "polylong",
            Self::Lanczos { .. } => "lanczos",
            Self::BoorGolub => "boor_golub",
            Self::Khatwani => "khatwani",
            Self::Sobhy => "sobhy",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CauerConfig {
    pub method: CauerMethod,
    pub precision: Precision,

    /// Relative tolerance for merging coincident Foster poles.
    pub merge_tolerance: f64,
}

impl Default for CauerConfig {
    fn default() -> Self {
        Self {
            method: CauerMethod::default(),
            precision: Precision::default(),
            merge_tolerance: DEFAULT_MERGE_TOLERANCE,
        }
    }
}

/// Ladder under construction, in arbitrary precision.
#[derive(Clone, Debug, Default)]
pub struct Ladder {
    pub resistance: Vec<Real>,
    pub capacitance: Vec<Real>,

    /// Rung at which an exact zero pivot stopped the expansion.
    pub truncated_at: Option<usize>,
}

impl Ladder {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            resistance: Vec::with_capacity(n),
            capacitance: Vec::with_capacity(n),
            truncated_at: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resistance.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resistance.is_empty()
    }

    pub fn push(&mut self, resistance: Real, capacitance: Real) {
        self.resistance.push(resistance);
        self.capacitance.push(capacitance);
    }

    /// Record an exact zero pivot at `step`.
    pub fn breakdown(&mut self, method: &str, step: usize) {
        tracing::warn!(
            "{}: exact zero pivot at rung {}; ladder truncated to {} rungs \
             (coincident poles or insufficient precision)",
            method,
            step,
            self.len()
        );
        self.truncated_at.get_or_insert(step);
    }
}

/// Decay rates `1/(RᵢCᵢ)` and weights `1/Cᵢ` of the Foster poles.
pub(crate) fn rates_and_weights(
    resistance: &[Real],
    capacitance: &[Real],
    precision: Precision,
) -> Option<(Vec<Real>, Vec<Real>)> {
    let one = precision.one();
    resistance
        .iter()
        .zip(capacitance.iter())
        .map(|(r, c)| {
            let rate = checked_div(&one, &(r * c))?;
            let weight = checked_div(&one, c)?;
            Some((rate, weight))
        })
        .collect::<Option<Vec<_>>>()
        .map(|pairs| pairs.into_iter().unzip())
}

/// Synthesis output.
#[derive(Clone, Debug)]
pub struct CauerSynthesis {
    pub network: CauerNetwork,

    /// Negative resistances plus negative capacitances, counted before any
    /// blockwise merge.
    pub negative_count: usize,

    /// `|ΣR_cauer − ΣR_foster| / ΣR_foster` of the unmerged ladder.
    pub resistance_drift: f64,

    /// Foster order after merging coincident poles.
    pub foster_order: usize,

    /// Set when an exact zero pivot ended the expansion early.
    pub truncated_at: Option<usize>,
}

/// Relative total-resistance error above which a ladder is reported.
pub const RESISTANCE_DRIFT_TOLERANCE: f64 = 1e-6;

fn report_negatives(method: &str, ladder: &CauerNetwork, precision: Precision) -> usize {
    let count = ladder.negative_count();
    if count > 0 {
        tracing::warn!(
            "{}: {} negative elements in a {}-rung ladder (first at rung {:?}); \
             consider more precision bits than {}",
            method,
            count,
            ladder.len(),
            ladder.first_invalid_rung(),
            precision.bits()
        );
    }
    count
}

/// Both networks share `Z(0)`, so their total resistances must agree.
fn report_drift(method: &str, ladder: &CauerNetwork, foster_total: f64) -> f64 {
    let drift = (ladder.total_resistance().0 - foster_total).abs() / foster_total;
    if !(drift <= RESISTANCE_DRIFT_TOLERANCE) {
        tracing::warn!(
            "{}: ladder total R = {:.6} differs from Foster total R = {:.6} (relative {:.2e})",
            method,
            ladder.total_resistance().0,
            foster_total,
            drift
        );
    }
    drift
}

/// Check the unmerged ladder, then apply the Lanczos block merge.
fn finish_ladder(
    method: CauerMethod,
    raw: CauerNetwork,
    foster_total: f64,
    precision: Precision,
) -> (CauerNetwork, usize, f64) {
    let negative_count = report_negatives(method.name(), &raw, precision);
    let drift = report_drift(method.name(), &raw, foster_total);
    let network = match method {
        CauerMethod::Lanczos { blockwise_sum_width } => raw.blockwise_sum(blockwise_sum_width),
        _ => raw,
    };
    (network, negative_count, drift)
}

/// Convert a Foster network into a Cauer ladder.
pub fn synthesize(foster: &FosterNetwork, config: &CauerConfig) -> NetworkResult<CauerSynthesis> {
    if foster.is_empty() {
        return Err(NetworkError::EmptyNetwork);
    }
    for (index, (&r, &c)) in foster.resistance.iter().zip(foster.capacitance.iter()).enumerate() {
        if !(r > 0.0 && c > 0.0 && r.is_finite() && c.is_finite()) {
            return Err(NetworkError::InvalidElement {
                index,
                resistance: r,
                capacitance: c,
            });
        }
    }

    let merged = merge_coincident_poles(foster, config.merge_tolerance);
    let precision = config.precision;
    let resistance = precision.reals(&merged.resistance)?;
    let capacitance = precision.reals(&merged.capacitance)?;

    let ladder = match config.method {
        CauerMethod::PolynomialLongDivision => {
            let z = RationalImpedance::from_foster(&resistance, &capacitance, precision);
            long_division::long_division(&z)
        }
        CauerMethod::Lanczos { .. } => lanczos::lanczos(&resistance, &capacitance, precision),
        CauerMethod::BoorGolub => boor_golub::boor_golub(&resistance, &capacitance, precision),
        CauerMethod::Khatwani | CauerMethod::Sobhy => {
            let z = RationalImpedance::from_foster(&resistance, &capacitance, precision);
            match z.monic_descending(precision) {
                Some((num, den)) => {
                    let fraction = if config.method == CauerMethod::Khatwani {
                        continued_fraction::khatwani(&num, &den, precision)
                    } else {
                        continued_fraction::sobhy(&num, &den, precision)
                    };
                    continued_fraction::ladder_from_j_fraction(config.method.name(), &fraction, precision)
                }
                None => {
                    let mut empty = Ladder::default();
                    empty.breakdown(config.method.name(), 0);
                    empty
                }
            }
        }
    };

    let raw = CauerNetwork::new(to_f64_vec(&ladder.resistance), to_f64_vec(&ladder.capacitance))?;
    let (network, negative_count, resistance_drift) =
        finish_ladder(config.method, raw, merged.total_resistance().0, precision);

    tracing::debug!(
        "{}: {} Foster pairs -> {} Cauer rungs at {} bits, total R = {:.6}",
        config.method.name(),
        merged.len(),
        network.len(),
        precision.bits(),
        network.total_resistance().0
    );

    Ok(CauerSynthesis {
        network,
        negative_count,
        resistance_drift,
        foster_order: merged.len(),
        truncated_at: ladder.truncated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::StructureFunction;
    use crate::synthetic::cauer_to_foster;

    const ALL_METHODS: [CauerMethod; 5] = [
        CauerMethod::PolynomialLongDivision,
        CauerMethod::Lanczos {
            blockwise_sum_width: 1,
        },
        CauerMethod::BoorGolub,
        CauerMethod::Khatwani,
        CauerMethod::Sobhy,
    ];

    fn config(method: CauerMethod, bits: usize) -> CauerConfig {
        CauerConfig {
            method,
            precision: Precision::new(bits).unwrap(),
            ..CauerConfig::default()
        }
    }

    fn reference_ladder() -> CauerNetwork {
        CauerNetwork::new(vec![1.0, 2.0, 0.5, 3.0, 1.0], vec![1e-3, 0.02, 0.5, 2.0, 20.0]).unwrap()
    }

    #[test]
    fn test_negatives_counted_before_block_merge() {
        let raw = CauerNetwork::new(vec![1.0, -0.2, 1.0, 1.0], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let method = CauerMethod::Lanczos {
            blockwise_sum_width: 2,
        };
        let (network, negatives, drift) = finish_ladder(method, raw, 2.8, Precision::default());

        assert_eq!(network.resistance, vec![0.8, 2.0]);
        assert_eq!(network.negative_count(), 0);
        assert_eq!(negatives, 1);
        assert!(drift < 1e-15);
    }

    #[test]
    fn test_resistance_drift_reported() {
        let raw = CauerNetwork::new(vec![1.0, 2.0], vec![1.0, 1.0]).unwrap();
        let (_, negatives, drift) = finish_ladder(CauerMethod::Sobhy, raw, 4.0, Precision::default());
        assert_eq!(negatives, 0);
        assert!((drift - 0.25).abs() < 1e-15);
        assert!(drift > RESISTANCE_DRIFT_TOLERANCE);
    }

    #[test]
    fn test_lanczos_matches_sobhy_over_ten_decades() {
        let tau: Vec<f64> = (0..30).map(|i| 10f64.powf(-6.0 + 10.0 * i as f64 / 29.0)).collect();
        let foster = FosterNetwork::new(vec![1.0; 30], tau).unwrap();
        let lanczos = CauerMethod::Lanczos {
            blockwise_sum_width: 1,
        };

        let reference = synthesize(&foster, &config(CauerMethod::Sobhy, 250)).unwrap();
        let result = synthesize(&foster, &config(lanczos, 250)).unwrap();

        assert_eq!(result.negative_count, 0);
        assert!(result.resistance_drift < 1e-9, "drift = {}", result.resistance_drift);
        assert_eq!(result.network.len(), reference.network.len());
        for (a, b) in result.network.resistance.iter().zip(reference.network.resistance.iter()) {
            assert!((a - b).abs() < 1e-9 * b, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_round_trip_every_method() {
        let ladder = reference_ladder();
        let foster = cauer_to_foster(&ladder).unwrap();

        for method in ALL_METHODS {
            let result = synthesize(&foster, &config(method, 250)).unwrap();
            assert_eq!(result.network.len(), ladder.len(), "{}", method.name());
            assert_eq!(result.negative_count, 0, "{}", method.name());
            assert!(result.truncated_at.is_none());

            for k in 0..ladder.len() {
                let dr = (result.network.resistance[k] - ladder.resistance[k]).abs();
                let dc = (result.network.capacitance[k] - ladder.capacitance[k]).abs();
                assert!(dr < 1e-6 * ladder.resistance[k], "{} R[{}]", method.name(), k);
                assert!(dc < 1e-6 * ladder.capacitance[k], "{} C[{}]", method.name(), k);
            }
        }
    }

    #[test]
    fn test_five_pair_example_with_duplicate_poles() {
        // τ = 1e-3, 1, 1e-3, 1e-2, 10: the two 1e-3 pairs are one pole.
        let foster = FosterNetwork::new(vec![10.0; 5], vec![1e-4, 1e-1, 1e-4, 1e-3, 1e0]).unwrap();

        let result = synthesize(&foster, &config(CauerMethod::Sobhy, 250)).unwrap();
        assert_eq!(result.foster_order, 4);
        assert_eq!(result.network.len(), 4);
        assert_eq!(result.negative_count, 0);
        assert!((result.network.total_resistance().0 - 50.0).abs() < 50.0 * 1e-3);

        let sf = StructureFunction::from_cauer(&result.network);
        assert!(sf.cumulative_resistance.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(sf.differential.len(), 3);

        // Every method agrees on the same impedance.
        for method in ALL_METHODS {
            let other = synthesize(&foster, &config(method, 250)).unwrap();
            assert_eq!(other.network.len(), 4, "{}", method.name());
            for k in 0..4 {
                let a = result.network.resistance[k];
                assert!((other.network.resistance[k] - a).abs() < 1e-9 * a, "{}", method.name());
            }
        }
    }

    #[test]
    fn test_more_bits_never_add_negative_elements() {
        // 14 equal resistors, τ log-spaced over six decades.
        let n = 14;
        let tau: Vec<f64> = (0..n)
            .map(|i| 10f64.powf(-4.0 + 6.0 * i as f64 / (n - 1) as f64))
            .collect();
        let foster = FosterNetwork::new(vec![1.0; n], tau.clone()).unwrap();

        let magnitude = |network: &CauerNetwork| -> f64 {
            network
                .resistance
                .iter()
                .chain(network.capacitance.iter())
                .filter(|&&v| v < 0.0)
                .map(|v| -v)
                .sum()
        };

        for method in [
            CauerMethod::Khatwani,
            CauerMethod::Sobhy,
            CauerMethod::PolynomialLongDivision,
        ] {
            let spurious: Vec<f64> = [96, 256, 1024]
                .iter()
                .map(|&bits| magnitude(&synthesize(&foster, &config(method, bits)).unwrap().network))
                .collect();
            assert!(spurious[1] <= spurious[0], "{} {:?}", method.name(), spurious);
            assert!(spurious[2] <= spurious[1], "{} {:?}", method.name(), spurious);
            assert_eq!(spurious[2], 0.0, "{}", method.name());
        }

        // The Markov-parameter route is the fragile one at 96 bits.
        let low = synthesize(&foster, &config(CauerMethod::Khatwani, 96)).unwrap();
        let high = synthesize(&foster, &config(CauerMethod::Khatwani, 1024)).unwrap();
        assert!(magnitude(&low.network) > magnitude(&high.network));
        assert!((high.network.total_resistance().0 - n as f64).abs() < 1e-9);
    }

    #[test]
    fn test_lanczos_blockwise_sum() {
        let foster = cauer_to_foster(&reference_ladder()).unwrap();
        let method = CauerMethod::Lanczos {
            blockwise_sum_width: 2,
        };
        let result = synthesize(&foster, &config(method, 250)).unwrap();
        // 5 rungs in blocks of 2: [0,1], [2,3,4]
        assert_eq!(result.network.len(), 2);
        assert!((result.network.resistance[0] - 3.0).abs() < 1e-9);
        assert!((result.network.resistance[1] - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_inputs() {
        let empty = FosterNetwork::new(vec![], vec![]).unwrap();
        assert!(matches!(
            synthesize(&empty, &CauerConfig::default()),
            Err(NetworkError::EmptyNetwork)
        ));

        let negative = FosterNetwork::new(vec![1.0, -2.0], vec![1.0, 1.0]).unwrap();
        assert!(matches!(
            synthesize(&negative, &CauerConfig::default()),
            Err(NetworkError::InvalidElement { index: 1, .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let foster = cauer_to_foster(&reference_ladder()).unwrap();
        for method in ALL_METHODS {
            let a = synthesize(&foster, &config(method, 160)).unwrap();
            let b = synthesize(&foster, &config(method, 160)).unwrap();
            assert_eq!(a.network, b.network);
        }
    }
}
