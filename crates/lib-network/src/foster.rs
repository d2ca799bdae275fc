//! Foster network construction from a time-constant spectrum.

use crate::error::{NetworkError, NetworkResult};
use lib_dsp::interpolation::resample_uniform;
use lib_types::{FosterNetwork, TimeConstantSpectrum};

/// Amplitudes below this are treated as deconvolution padding.
pub const DEFAULT_ZERO_FLOOR: f64 = 1e-10;

/// Relative distance below which two time constants are one pole.
pub const DEFAULT_MERGE_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub struct FosterConfig {
    /// Smallest amplitude kept.
    pub zero_floor: f64,

    /// Spline resampling factor; 1 keeps the spectrum grid.
    pub interpolation_factor: usize,
}

impl Default for FosterConfig {
    fn default() -> Self {
        Self {
            zero_floor: DEFAULT_ZERO_FLOOR,
            interpolation_factor: 1,
        }
    }
}

/// Foster network plus the spectrum it was built from.
#[derive(Clone, Debug)]
pub struct FosterBuild {
    /// Resampled and cropped spectrum, one sample per Foster pair.
    pub spectrum: TimeConstantSpectrum,
    pub network: FosterNetwork,
}

/// One RC pair per retained spectrum sample: `R = a·Δ`, `C = τ/R`.
///
/// With an interpolation factor above 1 the full spectrum is first resampled
/// onto `len · factor` uniform points by a cubic spline; cropping happens
/// afterwards, so `Δ` is always the uniform grid spacing.
pub fn build_foster(spectrum: &TimeConstantSpectrum, config: &FosterConfig) -> NetworkResult<FosterBuild> {
    if config.interpolation_factor == 0 {
        return Err(NetworkError::InvalidParameter(
            "interpolation factor must be at least 1".to_string(),
        ));
    }
    if !(config.zero_floor >= 0.0) {
        return Err(NetworkError::InvalidParameter(format!(
            "zero floor must be non-negative, got {}",
            config.zero_floor
        )));
    }
    if spectrum.len() < 2 {
        return Err(NetworkError::EmptySpectrum {
            floor: config.zero_floor,
        });
    }

    let (log_tau, amplitude) = if config.interpolation_factor > 1 {
        resample_uniform(
            &spectrum.log_tau,
            &spectrum.amplitude,
            spectrum.len() * config.interpolation_factor,
        )?
    } else {
        (spectrum.log_tau.clone(), spectrum.amplitude.clone())
    };
    let spacing = log_tau[1] - log_tau[0];

    let (kept_tau, kept_amp): (Vec<f64>, Vec<f64>) = log_tau
        .iter()
        .zip(amplitude.iter())
        .filter(|(_, &a)| a.is_finite() && a >= config.zero_floor && a > 0.0)
        .map(|(&x, &a)| (x, a))
        .unzip();

    if kept_tau.is_empty() {
        return Err(NetworkError::EmptySpectrum {
            floor: config.zero_floor,
        });
    }

    let resistance: Vec<f64> = kept_amp.iter().map(|a| a * spacing).collect();
    let capacitance: Vec<f64> = kept_tau
        .iter()
        .zip(resistance.iter())
        .map(|(x, r)| x.exp() / r)
        .collect();

    tracing::debug!(
        "foster: kept {} of {} samples (floor {:e}, factor {}), total R = {:.4}",
        kept_tau.len(),
        log_tau.len(),
        config.zero_floor,
        config.interpolation_factor,
        resistance.iter().sum::<f64>()
    );

    Ok(FosterBuild {
        spectrum: TimeConstantSpectrum::new(kept_tau, kept_amp),
        network: FosterNetwork::new(resistance, capacitance)?,
    })
}

/// Merge pairs whose time constants agree within `tolerance` (relative).
///
/// Coincident poles are a single pole of `Z(s)`; leaving them split makes
/// every continued-fraction tableau hit an exact zero pivot. Resistances add
/// and the first occurrence's time constant is kept.
pub fn merge_coincident_poles(network: &FosterNetwork, tolerance: f64) -> FosterNetwork {
    let mut resistance: Vec<f64> = Vec::with_capacity(network.len());
    let mut tau: Vec<f64> = Vec::with_capacity(network.len());

    for (r, c) in network.resistance.iter().zip(network.capacitance.iter()) {
        let t = r * c;
        match tau
            .iter()
            .position(|&existing| (existing - t).abs() <= tolerance * existing.abs().max(t.abs()))
        {
            Some(i) => resistance[i] += r,
            None => {
                resistance.push(*r);
                tau.push(t);
            }
        }
    }

    if resistance.len() < network.len() {
        tracing::debug!(
            "foster: merged {} coincident poles ({} remain)",
            network.len() - resistance.len(),
            resistance.len()
        );
    }

    let capacitance = tau.iter().zip(resistance.iter()).map(|(t, r)| t / r).collect();
    FosterNetwork {
        resistance,
        capacitance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_dsp::interpolation::linspace;

    #[test]
    fn test_crops_padding_and_negatives() {
        let log_tau = linspace(-5.0, 4.0, 10);
        let amplitude = vec![0.0, 1e-12, -0.3, 2.0, 1.0, 0.5, -1e-3, 0.0, 3.0, 0.0];
        let spectrum = TimeConstantSpectrum::new(log_tau.clone(), amplitude);

        let build = build_foster(&spectrum, &FosterConfig::default()).unwrap();
        assert_eq!(build.network.len(), 4);
        assert_eq!(build.spectrum.log_tau, vec![log_tau[3], log_tau[4], log_tau[5], log_tau[8]]);

        for ((r, c), (x, a)) in build
            .network
            .resistance
            .iter()
            .zip(build.network.capacitance.iter())
            .zip(build.spectrum.log_tau.iter().zip(build.spectrum.amplitude.iter()))
        {
            assert!((r - a * 1.0).abs() < 1e-12);
            assert!((r * c - x.exp()).abs() < 1e-12 * x.exp());
            assert!(*r > 0.0 && *c > 0.0);
        }

        // The pair after the dropped run still spans one grid step, not the gap.
        assert!((build.network.resistance[3] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_after_filtering() {
        let spectrum = TimeConstantSpectrum::new(linspace(0.0, 1.0, 5), vec![0.0, -1.0, 1e-11, 0.0, -2.0]);
        let err = build_foster(&spectrum, &FosterConfig::default()).unwrap_err();
        assert!(matches!(err, NetworkError::EmptySpectrum { .. }));
        assert!(err.to_string().contains("empty after filtering"));
    }

    #[test]
    fn test_interpolation_factor_preserves_total() {
        let log_tau = linspace(-6.0, 2.0, 81);
        let amplitude: Vec<f64> = log_tau.iter().map(|x| (-(x + 2.0) * (x + 2.0)).exp()).collect();
        let spectrum = TimeConstantSpectrum::new(log_tau, amplitude);

        let plain = build_foster(&spectrum, &FosterConfig::default()).unwrap();
        let fine = build_foster(
            &spectrum,
            &FosterConfig {
                interpolation_factor: 4,
                ..FosterConfig::default()
            },
        )
        .unwrap();

        assert!(fine.network.len() > 3 * plain.network.len());
        let r_plain = plain.network.total_resistance().0;
        let r_fine = fine.network.total_resistance().0;
        assert!((r_plain - r_fine).abs() / r_plain < 1e-2);
    }

    #[test]
    fn test_invalid_config() {
        let spectrum = TimeConstantSpectrum::new(linspace(0.0, 1.0, 3), vec![1.0; 3]);
        let zero_factor = FosterConfig {
            interpolation_factor: 0,
            ..FosterConfig::default()
        };
        assert!(build_foster(&spectrum, &zero_factor).is_err());
    }

    #[test]
    fn test_merge_coincident_poles() {
        // τ = 1e-3, 1, 1e-3, 1e-2, 1
        let network = FosterNetwork::new(vec![10.0; 5], vec![1e-4, 1e-1, 1e-4, 1e-3, 1e-1]).unwrap();
        let merged = merge_coincident_poles(&network, DEFAULT_MERGE_TOLERANCE);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.resistance, vec![20.0, 20.0, 10.0]);
        assert!((merged.total_resistance().0 - 50.0).abs() < 1e-12);
        let taus: Vec<f64> = merged.time_constants().iter().map(|t| t.0).collect();
        assert!((taus[0] - 1e-3).abs() < 1e-15);
        assert!((taus[1] - 1.0).abs() < 1e-12);
    }
}
