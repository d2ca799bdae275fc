//! Bootstrap: repeat the analysis on noisy copies of the transient.

use crate::config::{BootstrapSection, BootstrapSource};
use crate::orchestrator::{AnalysisResults, Orchestrator};
use anyhow::{Context, Result};
use lib_dsp::interpolation::{interpolate_linear, linspace};
use lib_dsp::{add_gaussian_noise, Band};
use lib_types::TransientCurve;
use rayon::prelude::*;

/// Totals of one bootstrap repetition.
#[derive(Clone, Debug)]
pub struct BootstrapRun {
    pub total_resistance: f64,
    pub total_capacitance: f64,
    pub negative_count: usize,
    pub rungs: usize,
}

/// Cumulative capacitance on a shared resistance grid.
#[derive(Clone, Debug)]
pub struct StructureBand {
    pub cumulative_resistance: Vec<f64>,
    pub cumulative_capacitance: Band,

    /// Repetitions left out for negative or zero ladder elements.
    pub excluded: usize,
}

#[derive(Clone, Debug)]
pub struct BootstrapResults {
    /// Standard deviation of the added noise, K/W.
    pub noise_sigma: f64,
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub runs: Vec<BootstrapRun>,

    pub log_time: Vec<f64>,
    pub impedance: Band,
    pub derivative: Band,

    pub log_tau: Vec<f64>,
    pub spectrum: Band,
    pub cumulative_spectrum: Band,

    /// `None` when no repetition produced a usable ladder.
    pub structure: Option<StructureBand>,
}

impl BootstrapResults {
    /// Median and band of the total resistance.
    pub fn total_resistance(&self) -> Result<Band> {
        let totals: Vec<Vec<f64>> = self.runs.iter().map(|r| vec![r.total_resistance]).collect();
        Ok(Band::across(&totals, self.lower_percentile, self.upper_percentile)?)
    }
}

/// Run `section.repetitions` noisy analyses of `curve` in parallel.
pub fn run_bootstrap(
    orchestrator: &Orchestrator,
    curve: &TransientCurve,
    base: &AnalysisResults,
    section: &BootstrapSection,
) -> Result<BootstrapResults> {
    let reference = match section.source {
        BootstrapSource::Data => curve.impedance().to_vec(),
        BootstrapSource::Model => {
            let log_time = curve.to_log_time().log_time;
            interpolate_linear(&base.forward.log_time, &base.forward.impedance, &log_time)
                .context("Failed to resample the back-calculated impedance")?
        }
    };
    let noise_sigma = curve.to_log_time().impedance_span() / section.signal_to_noise;
    tracing::info!(
        "Bootstrap: {} repetitions, σ = {:.3e} K/W (SNR {})",
        section.repetitions,
        noise_sigma,
        section.signal_to_noise
    );

    let repetitions: Vec<AnalysisResults> = (0..section.repetitions)
        .into_par_iter()
        .map(|k| {
            let _span = tracing::info_span!("bootstrap", repetition = k).entered();
            let noisy = add_gaussian_noise(&reference, noise_sigma, section.seed.wrapping_add(k as u64))?;
            let noisy = TransientCurve::new(curve.time().to_vec(), noisy)?;
            orchestrator
                .analyze(&noisy)
                .with_context(|| format!("bootstrap repetition {} failed", k))
        })
        .collect::<Result<_>>()?;

    let (lower, upper) = (section.lower_percentile, section.upper_percentile);

    let runs = repetitions
        .iter()
        .map(|r| BootstrapRun {
            total_resistance: r.cauer.network.total_resistance().0,
            total_capacitance: r.cauer.network.total_capacitance().0,
            negative_count: r.cauer.negative_count,
            rungs: r.cauer.network.len(),
        })
        .collect();

    let results = BootstrapResults {
        noise_sigma,
        lower_percentile: lower,
        upper_percentile: upper,
        runs,
        log_time: base.estimate.log_time.clone(),
        impedance: band_of(&repetitions, |r| &r.estimate.smoothed, lower, upper)?,
        derivative: band_of(&repetitions, |r| &r.estimate.derivative, lower, upper)?,
        log_tau: base.deconvolution.spectrum.log_tau.clone(),
        spectrum: band_of(&repetitions, |r| &r.deconvolution.spectrum.amplitude, lower, upper)?,
        cumulative_spectrum: band_of(&repetitions, |r| &r.deconvolution.cumulative, lower, upper)?,
        structure: structure_band(&repetitions, section.structure_points, lower, upper)?,
    };

    tracing::info!(
        "Bootstrap spectrum band: max width {:.3e} K/W",
        results.spectrum.max_width()
    );
    Ok(results)
}

fn band_of<F>(repetitions: &[AnalysisResults], pick: F, lower: f64, upper: f64) -> Result<Band>
where
    F: Fn(&AnalysisResults) -> &[f64],
{
    let curves: Vec<Vec<f64>> = repetitions.iter().map(|r| pick(r).to_vec()).collect();
    Ok(Band::across(&curves, lower, upper)?)
}

/// Interpolate each ladder's cumulative capacitance onto `[0, min R_th]`.
fn structure_band(
    repetitions: &[AnalysisResults],
    points: usize,
    lower: f64,
    upper: f64,
) -> Result<Option<StructureBand>> {
    let usable: Vec<&AnalysisResults> = repetitions
        .iter()
        .filter(|r| r.cauer.negative_count == 0 && !r.structure.is_empty())
        .collect();
    let limit = usable
        .iter()
        .map(|r| r.cauer.network.total_resistance().0)
        .fold(f64::INFINITY, f64::min);
    if usable.is_empty() || !(limit > 0.0) {
        tracing::warn!("Bootstrap: no repetition gave a non-negative ladder; skipping the structure band");
        return Ok(None);
    }

    let grid = linspace(0.0, limit, points);
    let curves: Vec<Vec<f64>> = usable
        .iter()
        .filter_map(|r| {
            let mut resistance = vec![0.0];
            resistance.extend_from_slice(&r.structure.cumulative_resistance);
            let mut capacitance = vec![0.0];
            capacitance.extend_from_slice(&r.structure.cumulative_capacitance);
            interpolate_linear(&resistance, &capacitance, &grid).ok()
        })
        .collect();

    let excluded = repetitions.len() - curves.len();
    if excluded > 0 {
        tracing::warn!("Bootstrap: {} repetitions left out of the structure band", excluded);
    }
    if curves.is_empty() {
        return Ok(None);
    }

    Ok(Some(StructureBand {
        cumulative_resistance: grid,
        cumulative_capacitance: Band::across(&curves, lower, upper)?,
        excluded,
    }))
}
