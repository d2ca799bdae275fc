//! Analysis orchestration.

use crate::bootstrap::{run_bootstrap, BootstrapResults};
use crate::config::{validate_config, AnalysisConfig, InputConfig, PredictionSection, TheoreticalSection, ValueKind};
use anyhow::{Context, Result};
use lib_dsp::interpolation::linspace;
use lib_dsp::{
    add_gaussian_noise, back_calculate, deconvolve, estimate_derivative, Deconvolution, DerivativeConfig,
    DerivativeEstimate, ForwardModel,
};
use lib_network::{
    build_foster, predict_temperature, synthesize, CauerSynthesis, DistributedLadder, FosterBuild, FosterConfig,
    LineProfile, StructureFunction, TemperaturePrediction,
};
use lib_types::{Celsius, FosterNetwork, TimeConstantSpectrum, TransientCurve};
use rayon::prelude::*;
use std::path::Path;

/// Pipeline driver: transient → derivative → spectrum → Foster → Cauer → structure function.
pub struct Orchestrator {
    config: AnalysisConfig,
}

impl Orchestrator {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        // Catch a bad precision before any numerical work.
        config.cauer.to_config()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Read the configured input, or generate the theoretical transient,
    /// and run the analysis.
    pub fn run(&self) -> Result<AnalysisResults> {
        tracing::info!("Starting analysis: {}", self.config.name);
        match (&self.config.input, &self.config.theoretical) {
            (Some(input), _) => {
                let curve = load_transient(input)?;
                self.run_on(&curve)
            }
            (None, Some(section)) => {
                let reference = theoretical_reference(section)?;
                let mut results = self.run_on(&reference.transient)?;
                results.theoretical = Some(reference);
                Ok(results)
            }
            (None, None) => anyhow::bail!("configuration has neither [input] nor [theoretical]"),
        }
    }

    /// Run the analysis and every configured optional stage on a loaded transient.
    pub fn run_on(&self, curve: &TransientCurve) -> Result<AnalysisResults> {
        let mut results = self.analyze(curve)?;

        if let Some(section) = &self.config.bootstrap {
            results.bootstrap = Some(run_bootstrap(self, curve, &results, section)?);
        }
        if let Some(section) = &self.config.prediction {
            results.prediction = Some(predict(&results.foster.network, section)?);
        }
        if self.config.sweep.is_some() {
            results.sweep = self.sweep(curve)?;
        }

        Ok(results)
    }

    /// Rerun the core pipeline once per configured sweep value.
    pub fn sweep(&self, curve: &TransientCurve) -> Result<Vec<SweepRun>> {
        let Some(section) = &self.config.sweep else {
            return Ok(Vec::new());
        };
        tracing::info!(
            "Sweeping {} over {} values",
            section.parameter.name(),
            section.values.len()
        );

        section
            .values
            .par_iter()
            .map(|&value| {
                let _span = tracing::info_span!("sweep", value).entered();
                let mut config = self.config.clone();
                config.sweep = None;
                config.bootstrap = None;
                config.prediction = None;
                section.parameter.apply(&mut config, value)?;
                validate_config(&config)?;

                let results = Orchestrator::new(config)?
                    .analyze(curve)
                    .with_context(|| format!("sweep {} = {} failed", section.parameter.name(), value))?;
                Ok(SweepRun { value, results })
            })
            .collect()
    }

    /// Core pipeline: derivative, deconvolution, Foster, Cauer, structure function.
    pub fn analyze(&self, curve: &TransientCurve) -> Result<AnalysisResults> {
        let (t_start, t_end) = curve.span();
        tracing::info!(
            "Transient: {} samples, t = {:.3e} .. {:.3e} s, Z(end) = {:.4} K/W",
            curve.len(),
            t_start.0,
            t_end.0,
            curve.final_impedance().0
        );

        let log_curve = curve.to_log_time();
        let derivative_config: DerivativeConfig = (&self.config.derivative).into();
        let estimate = estimate_derivative(&log_curve, &derivative_config)
            .context("Failed to estimate the impedance derivative")?;

        let method = self.config.deconvolution.method();
        tracing::info!("Deconvolving ({}) on {} grid points", method.name(), estimate.padded_len());
        let deconvolution = deconvolve(&estimate, &method)
            .with_context(|| format!("{} deconvolution failed", method.name()))?;

        let forward = back_calculate(&deconvolution.spectrum)
            .context("Failed to back-calculate the impedance from the spectrum")?;

        let foster_config: FosterConfig = (&self.config.foster).into();
        let foster = build_foster(&deconvolution.spectrum, &foster_config)
            .context("Failed to build the Foster network")?;
        tracing::info!(
            "Foster network: {} pairs, total R = {:.4} K/W",
            foster.network.len(),
            foster.network.total_resistance().0
        );

        let cauer_config = self.config.cauer.to_config()?;
        let cauer = synthesize(&foster.network, &cauer_config)
            .with_context(|| format!("{} Cauer synthesis failed", cauer_config.method.name()))?;
        if cauer.negative_count > 0 {
            tracing::warn!(
                "Cauer network has {} negative elements; deep ladder rungs are unreliable",
                cauer.negative_count
            );
        }

        let structure = StructureFunction::from_cauer(&cauer.network);
        tracing::info!(
            "Structure function: {} points, R_th = {:.4} K/W, C_th = {:.4e} J/K",
            structure.len(),
            cauer.network.total_resistance().0,
            cauer.network.total_capacitance().0
        );

        Ok(AnalysisResults {
            name: self.config.name.clone(),
            estimate,
            deconvolution,
            forward,
            foster,
            cauer,
            structure,
            capacitance_limit: self.config.output.capacitance_limit,
            theoretical: None,
            bootstrap: None,
            prediction: None,
            sweep: Vec::new(),
        })
    }
}

/// Distributed-line model together with the transient generated from it.
#[derive(Clone, Debug)]
pub struct TheoreticalReference {
    pub ladder: DistributedLadder,
    pub spectrum: TimeConstantSpectrum,

    /// Derivative and impedance of the exact spectrum.
    pub forward: ForwardModel,
    pub profile: LineProfile,

    /// Impedance handed to the pipeline, noise included.
    pub transient: TransientCurve,
}

/// Build the reference spectrum of a distributed line and its transient.
pub fn theoretical_reference(section: &TheoreticalSection) -> Result<TheoreticalReference> {
    let ladder = DistributedLadder::new(
        section.resistance.clone(),
        section.capacitance.clone(),
        section.length.clone(),
    )
    .context("Invalid theoretical model")?;

    let [start, end] = section.log_time;
    let log_time = linspace(start, end, section.samples);
    let spectrum = ladder.time_constant_spectrum(&log_time, section.delta_degrees)?;
    let forward = back_calculate(&spectrum).context("Failed to integrate the theoretical spectrum")?;

    let impedance = add_gaussian_noise(&forward.impedance, section.added_noise, section.seed)?;
    let time = log_time.iter().map(|x| x.exp()).collect();
    let transient = TransientCurve::new(time, impedance).context("Invalid theoretical transient")?;

    tracing::info!(
        "Theoretical model: {} segments, R_th = {:.4} K/W, {} samples, noise {:.1e} K/W",
        ladder.len(),
        ladder.total_resistance(),
        section.samples,
        section.added_noise
    );

    Ok(TheoreticalReference {
        profile: ladder.profile(section.points_per_segment),
        ladder,
        spectrum,
        forward,
        transient,
    })
}

/// Predict the temperature rise for the configured power profile.
pub fn predict(network: &FosterNetwork, section: &PredictionSection) -> Result<TemperaturePrediction> {
    let (time, power) = read_columns(&section.path, section.time_column, section.power_column, section.skip_rows)?;
    let prediction = predict_temperature(network, &time, &power, section.sampling_period)
        .with_context(|| format!("Temperature prediction for {:?} failed", section.path))?;
    tracing::info!(
        "Temperature prediction: {} samples, peak rise {:.4} K",
        prediction.time.len(),
        prediction.peak()
    );
    Ok(prediction)
}

/// One value of a parameter sweep.
#[derive(Debug)]
pub struct SweepRun {
    pub value: f64,
    pub results: AnalysisResults,
}

/// Everything the pipeline produces, for output and re-display.
#[derive(Debug)]
pub struct AnalysisResults {
    pub name: String,
    pub estimate: DerivativeEstimate,
    pub deconvolution: Deconvolution,

    /// Derivative and impedance regenerated from the spectrum.
    pub forward: ForwardModel,

    pub foster: FosterBuild,
    pub cauer: CauerSynthesis,
    pub structure: StructureFunction,

    /// Display cutoff for the structure function.
    pub capacitance_limit: f64,

    pub theoretical: Option<TheoreticalReference>,
    pub bootstrap: Option<BootstrapResults>,
    pub prediction: Option<TemperaturePrediction>,
    pub sweep: Vec<SweepRun>,
}

impl AnalysisResults {
    /// Structure function up to the display capacitance limit.
    pub fn displayed_structure(&self) -> StructureFunction {
        self.structure.truncated(self.capacitance_limit)
    }
}

/// Read the two configured columns of a numeric text file.
///
/// Blank lines and lines starting with `#` are ignored; fields may be
/// separated by whitespace, commas or semicolons.
pub fn read_columns(path: &Path, time_column: usize, value_column: usize, skip_rows: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {:?}", path))?;

    let mut time = Vec::new();
    let mut values = Vec::new();
    for (number, line) in content.lines().enumerate().skip(skip_rows) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|f| !f.is_empty())
            .collect();
        let field = |column: usize| -> Result<f64> {
            let text = fields.get(column).with_context(|| {
                format!("{:?} line {}: no column {}", path, number + 1, column)
            })?;
            text.parse::<f64>()
                .with_context(|| format!("{:?} line {}: {:?} is not a number", path, number + 1, text))
        };

        time.push(field(time_column)?);
        values.push(field(value_column)?);
    }

    tracing::debug!("Read {} samples from {:?}", time.len(), path);
    Ok((time, values))
}

/// Load the input transient as thermal impedance.
pub fn load_transient(input: &InputConfig) -> Result<TransientCurve> {
    let (time, values) = read_columns(&input.path, input.time_column, input.value_column, input.skip_rows)?;

    let curve = match input.kind {
        ValueKind::Impedance => TransientCurve::new(time, values),
        ValueKind::Temperature => {
            let step = input
                .power_step
                .as_ref()
                .context("temperature input needs a power step")?;
            let t_zero = input
                .t_zero
                .or_else(|| values.first().copied())
                .context("temperature input is empty")?;
            let temperature: Vec<Celsius> = values.into_iter().map(Celsius).collect();
            TransientCurve::from_temperature(time, &temperature, Celsius(t_zero), step)
        }
    };

    curve.with_context(|| format!("Invalid transient in {:?}", input.path))
}
