//! Analysis configuration loading and validation.

use anyhow::{Context, Result};
use lib_dsp::{DeconvolutionMethod, DerivativeConfig, FilterConfig, FilterKind, LassoConfig, Penalty, TauGrid};
use lib_network::{
    CauerConfig, CauerMethod, FosterConfig, Precision, DEFAULT_BLOCKWISE_SUM_WIDTH,
    DEFAULT_DISPLAY_CAPACITANCE_LIMIT, DEFAULT_PRECISION_BITS, MIN_PRECISION_BITS,
};
use lib_network::foster::{DEFAULT_MERGE_TOLERANCE, DEFAULT_ZERO_FLOOR};
use lib_network::DEFAULT_LINE_DELTA_DEGREES;
use lib_types::PowerStep;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level analysis configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Analysis name, used in the summary.
    #[serde(default = "default_name")]
    pub name: String,

    /// Measured transient; exactly one of `input` and `theoretical` is set.
    pub input: Option<InputConfig>,

    /// Distributed RC reference model generating the transient.
    pub theoretical: Option<TheoreticalSection>,

    #[serde(default)]
    pub derivative: DerivativeSection,

    #[serde(default)]
    pub deconvolution: DeconvolutionSection,

    #[serde(default)]
    pub foster: FosterSection,

    #[serde(default)]
    pub cauer: CauerSection,

    #[serde(default)]
    pub output: OutputSection,

    pub bootstrap: Option<BootstrapSection>,

    pub prediction: Option<PredictionSection>,

    pub sweep: Option<SweepSection>,
}

fn default_name() -> String {
    "analysis".to_string()
}

/// Meaning of the value column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Thermal impedance in K/W.
    #[default]
    Impedance,
    /// Temperature in °C; needs `[input.power_step]`.
    Temperature,
}

/// Two-column numeric input.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Text file with one sample per line. Relative paths are resolved
    /// against the configuration file's directory.
    pub path: PathBuf,

    #[serde(default)]
    pub time_column: usize,

    #[serde(default = "default_value_column")]
    pub value_column: usize,

    /// Header lines to skip before parsing.
    #[serde(default)]
    pub skip_rows: usize,

    #[serde(default)]
    pub kind: ValueKind,

    /// Power step for temperature input.
    pub power_step: Option<PowerStep>,

    /// Reference temperature; the first sample when absent.
    pub t_zero: Option<f64>,
}

fn default_value_column() -> usize { 1 }

/// Adaptive derivative window, mirroring [`DerivativeConfig`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativeSection {
    /// Smallest window half-length (ln t).
    pub min_length: f64,
    /// Largest window half-length (ln t).
    pub max_length: f64,
    pub increment: f64,
    pub min_points: usize,
    /// Percent² of the total impedance rise.
    pub expected_var: f64,
    pub min_index: usize,
    pub grid_size: usize,
    pub pad_pre: f64,
    pub pad_after: f64,
}

impl Default for DerivativeSection {
    fn default() -> Self {
        DerivativeConfig::default().into()
    }
}

impl From<DerivativeConfig> for DerivativeSection {
    fn from(c: DerivativeConfig) -> Self {
        Self {
            min_length: c.min_length,
            max_length: c.max_length,
            increment: c.increment,
            min_points: c.min_points,
            expected_var: c.expected_var,
            min_index: c.min_index,
            grid_size: c.grid_size,
            pad_pre: c.pad_pre,
            pad_after: c.pad_after,
        }
    }
}

impl From<&DerivativeSection> for DerivativeConfig {
    fn from(s: &DerivativeSection) -> Self {
        Self {
            min_length: s.min_length,
            max_length: s.max_length,
            increment: s.increment,
            min_points: s.min_points,
            expected_var: s.expected_var,
            min_index: s.min_index,
            grid_size: s.grid_size,
            pad_pre: s.pad_pre,
            pad_after: s.pad_after,
        }
    }
}

/// Deconvolution strategy selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeconvolutionKind {
    Fourier,
    #[default]
    Bayesian,
    Lasso,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeconvolutionSection {
    pub method: DeconvolutionKind,

    /// Richardson–Lucy steps (Bayesian, and the lasso hybrid prior).
    pub steps: usize,

    pub filter: FilterSection,

    pub lasso: LassoSection,
}

fn default_steps() -> usize { 1000 }

impl Default for DeconvolutionSection {
    fn default() -> Self {
        Self {
            method: DeconvolutionKind::default(),
            steps: default_steps(),
            filter: FilterSection::default(),
            lasso: LassoSection::default(),
        }
    }
}

impl DeconvolutionSection {
    pub fn method(&self) -> DeconvolutionMethod {
        match self.method {
            DeconvolutionKind::Fourier => DeconvolutionMethod::Fourier((&self.filter).into()),
            DeconvolutionKind::Bayesian => DeconvolutionMethod::Bayesian { steps: self.steps },
            DeconvolutionKind::Lasso => {
                let mut lasso: LassoConfig = (&self.lasso).into();
                lasso.prior_steps = self.steps;
                DeconvolutionMethod::Lasso(lasso)
            }
        }
    }
}

/// Low-pass filter family names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterName {
    #[default]
    Hann,
    Gaussian,
    Fermi,
    Nuttall,
    BlackmanHarris,
    BlackmanNuttall,
    Rectangular,
}

impl From<FilterName> for FilterKind {
    fn from(name: FilterName) -> Self {
        match name {
            FilterName::Hann => FilterKind::Hann,
            FilterName::Gaussian => FilterKind::Gaussian,
            FilterName::Fermi => FilterKind::Fermi,
            FilterName::Nuttall => FilterKind::Nuttall,
            FilterName::BlackmanHarris => FilterKind::BlackmanHarris,
            FilterName::BlackmanNuttall => FilterKind::BlackmanNuttall,
            FilterName::Rectangular => FilterKind::Rectangular,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSection {
    pub kind: FilterName,

    /// Cycles per unit ln t.
    pub cutoff: f64,

    /// Gaussian σ or Fermi width; 0 selects the family default.
    pub parameter: f64,
}

impl Default for FilterSection {
    fn default() -> Self {
        let filter = FilterConfig::default();
        Self {
            kind: FilterName::default(),
            cutoff: filter.cutoff,
            parameter: filter.parameter,
        }
    }
}

impl From<&FilterSection> for FilterConfig {
    fn from(s: &FilterSection) -> Self {
        Self {
            kind: s.kind.into(),
            cutoff: s.cutoff,
            parameter: s.parameter,
        }
    }
}

/// Candidate time-constant grid for the lasso.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TauGridName {
    #[default]
    Aligned,
    LogSpaced,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LassoSection {
    pub tau_grid: TauGridName,

    /// Candidates for the log-spaced grid.
    pub tau_count: usize,

    /// Fixed penalty; cross-validated when absent.
    pub alpha: Option<f64>,

    pub folds: usize,
    pub alphas: usize,
    pub hybrid: bool,
    pub max_iter: usize,
    pub tolerance: f64,
}

fn default_tau_count() -> usize { 200 }

impl Default for LassoSection {
    fn default() -> Self {
        let lasso = LassoConfig::default();
        let (folds, alphas) = match lasso.penalty {
            Penalty::CrossValidated { folds, alphas } => (folds, alphas),
            Penalty::Fixed(_) => (5, 20),
        };
        Self {
            tau_grid: TauGridName::default(),
            tau_count: default_tau_count(),
            alpha: None,
            folds,
            alphas,
            hybrid: lasso.hybrid,
            max_iter: lasso.max_iter,
            tolerance: lasso.tolerance,
        }
    }
}

impl From<&LassoSection> for LassoConfig {
    fn from(s: &LassoSection) -> Self {
        Self {
            tau_grid: match s.tau_grid {
                TauGridName::Aligned => TauGrid::Aligned,
                TauGridName::LogSpaced => TauGrid::LogSpaced { count: s.tau_count },
            },
            penalty: match s.alpha {
                Some(alpha) => Penalty::Fixed(alpha),
                None => Penalty::CrossValidated {
                    folds: s.folds,
                    alphas: s.alphas,
                },
            },
            hybrid: s.hybrid,
            max_iter: s.max_iter,
            tolerance: s.tolerance,
            ..LassoConfig::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FosterSection {
    pub zero_floor: f64,
    pub interpolation_factor: usize,
}

impl Default for FosterSection {
    fn default() -> Self {
        Self {
            zero_floor: DEFAULT_ZERO_FLOOR,
            interpolation_factor: 1,
        }
    }
}

impl From<&FosterSection> for FosterConfig {
    fn from(s: &FosterSection) -> Self {
        Self {
            zero_floor: s.zero_floor,
            interpolation_factor: s.interpolation_factor,
        }
    }
}

/// Cauer synthesis algorithm names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CauerKind {
    #[serde(rename = "polylong")]
    #[value(name = "polylong")]
    PolyLong,
    Lanczos,
    #[value(name = "boor_golub")]
    BoorGolub,
    Khatwani,
    #[default]
    Sobhy,
}

impl CauerKind {
    pub fn method(self, blockwise_sum_width: usize) -> CauerMethod {
        match self {
            Self::PolyLong => CauerMethod::PolynomialLongDivision,
            Self::Lanczos => CauerMethod::Lanczos { blockwise_sum_width },
            Self::BoorGolub => CauerMethod::BoorGolub,
            Self::Khatwani => CauerMethod::Khatwani,
            Self::Sobhy => CauerMethod::Sobhy,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CauerSection {
    pub method: CauerKind,
    pub precision_bits: usize,

    /// Lanczos only; 1 disables merging.
    pub blockwise_sum_width: usize,

    /// Relative tolerance for merging coincident Foster poles.
    pub merge_tolerance: f64,
}

impl Default for CauerSection {
    fn default() -> Self {
        Self {
            method: CauerKind::default(),
            precision_bits: DEFAULT_PRECISION_BITS,
            blockwise_sum_width: DEFAULT_BLOCKWISE_SUM_WIDTH,
            merge_tolerance: DEFAULT_MERGE_TOLERANCE,
        }
    }
}

impl CauerSection {
    pub fn to_config(&self) -> Result<CauerConfig> {
        Ok(CauerConfig {
            method: self.method.method(self.blockwise_sum_width),
            precision: Precision::new(self.precision_bits)?,
            merge_tolerance: self.merge_tolerance,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub directory: PathBuf,

    /// Structure-function points beyond this cumulative capacitance are not written.
    pub capacitance_limit: f64,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            capacitance_limit: DEFAULT_DISPLAY_CAPACITANCE_LIMIT,
        }
    }
}

/// Chain of uniform RC lines evaluated instead of a measurement.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TheoreticalSection {
    /// Segment resistances (K/W), heat source first.
    pub resistance: Vec<f64>,

    /// Segment capacitances (J/K).
    pub capacitance: Vec<f64>,

    /// Segment lengths for the position column of the reference profile.
    pub length: Option<Vec<f64>>,

    /// ln t range of the generated transient and reference spectrum.
    #[serde(default = "default_theoretical_log_time")]
    pub log_time: [f64; 2],

    #[serde(default = "default_theoretical_samples")]
    pub samples: usize,

    /// Angle off the negative real axis, degrees.
    #[serde(default = "default_theoretical_delta")]
    pub delta_degrees: f64,

    /// Gaussian noise (K/W) added to the generated impedance.
    #[serde(default)]
    pub added_noise: f64,

    #[serde(default)]
    pub seed: u64,

    #[serde(default = "default_points_per_segment")]
    pub points_per_segment: usize,
}

fn default_theoretical_log_time() -> [f64; 2] { [-20.0, 10.0] }
fn default_theoretical_samples() -> usize { 30_000 }
fn default_theoretical_delta() -> f64 { DEFAULT_LINE_DELTA_DEGREES }
fn default_points_per_segment() -> usize { 50 }

/// Curve the bootstrap adds noise to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapSource {
    /// The measured (or generated) transient.
    #[default]
    Data,
    /// The impedance back-calculated from the fitted spectrum.
    Model,
}

/// Repeated analysis of noisy copies of the transient.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapSection {
    pub repetitions: usize,

    /// Impedance span over noise standard deviation.
    pub signal_to_noise: f64,

    pub source: BootstrapSource,

    /// Repetition `k` draws its noise from `seed + k`.
    pub seed: u64,

    pub lower_percentile: f64,
    pub upper_percentile: f64,

    /// Resistance grid size for the structure-function band.
    pub structure_points: usize,
}

impl Default for BootstrapSection {
    fn default() -> Self {
        Self {
            repetitions: 10,
            signal_to_noise: 100.0,
            source: BootstrapSource::default(),
            seed: 0,
            lower_percentile: 5.0,
            upper_percentile: 95.0,
            structure_points: 200,
        }
    }
}

/// Power profile to predict the temperature response for.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionSection {
    /// Text file with time (s) and power (W) columns, resolved like `input.path`.
    pub path: PathBuf,

    #[serde(default)]
    pub time_column: usize,

    #[serde(default = "default_value_column")]
    pub power_column: usize,

    #[serde(default)]
    pub skip_rows: usize,

    /// Uniform resampling period, s.
    #[serde(default = "default_sampling_period")]
    pub sampling_period: f64,
}

fn default_sampling_period() -> f64 { 1e-3 }

/// Parameter varied by a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    DeconvolutionSteps,
    FilterCutoff,
    LassoAlpha,
    ExpectedVar,
    GridSize,
    PrecisionBits,
    BlockwiseSumWidth,
}

impl SweepParameter {
    pub fn name(self) -> &'static str {
        match self {
            Self::DeconvolutionSteps => "deconvolution_steps",
            Self::FilterCutoff => "filter_cutoff",
            Self::LassoAlpha => "lasso_alpha",
            Self::ExpectedVar => "expected_var",
            Self::GridSize => "grid_size",
            Self::PrecisionBits => "precision_bits",
            Self::BlockwiseSumWidth => "blockwise_sum_width",
        }
    }

    /// Set this parameter in `config`. Counts must be whole numbers.
    pub fn apply(self, config: &mut AnalysisConfig, value: f64) -> Result<()> {
        let count = || -> Result<usize> {
            if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
                Ok(value as usize)
            } else {
                anyhow::bail!("sweep value {} for {} is not a whole number", value, self.name())
            }
        };
        match self {
            Self::DeconvolutionSteps => config.deconvolution.steps = count()?,
            Self::FilterCutoff => config.deconvolution.filter.cutoff = value,
            Self::LassoAlpha => config.deconvolution.lasso.alpha = Some(value),
            Self::ExpectedVar => config.derivative.expected_var = value,
            Self::GridSize => config.derivative.grid_size = count()?,
            Self::PrecisionBits => config.cauer.precision_bits = count()?,
            Self::BlockwiseSumWidth => config.cauer.blockwise_sum_width = count()?,
        }
        Ok(())
    }
}

/// Rerun the core pipeline once per value of one parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSection {
    pub parameter: SweepParameter,
    pub values: Vec<f64>,
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = if path.extension().map_or(false, |e| e == "json") {
        parse_json(&content)?
    } else {
        parse_toml(&content)?
    };

    let dir = path.parent().unwrap_or(Path::new(""));
    if let Some(input) = config.input.as_mut() {
        input.path = resolve(dir, &input.path)?;
    }
    if let Some(prediction) = config.prediction.as_mut() {
        prediction.path = resolve(dir, &prediction.path)?;
    }

    Ok(config)
}

/// Resolve `file` against `dir` and check that it exists.
fn resolve(dir: &Path, file: &Path) -> Result<PathBuf> {
    let resolved = if file.is_relative() { dir.join(file) } else { file.to_path_buf() };
    if !resolved.exists() {
        anyhow::bail!("Input file not found: {:?}", resolved);
    }
    Ok(resolved)
}

pub fn parse_toml(content: &str) -> Result<AnalysisConfig> {
    let config: AnalysisConfig = toml::from_str(content).context("Failed to parse config as TOML")?;
    validate_config(&config)?;
    Ok(config)
}

pub fn parse_json(content: &str) -> Result<AnalysisConfig> {
    let config: AnalysisConfig = serde_json::from_str(content).context("Failed to parse config as JSON")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration.
pub fn validate_config(config: &AnalysisConfig) -> Result<()> {
    match (&config.input, &config.theoretical) {
        (Some(input), None) => {
            if input.time_column == input.value_column {
                anyhow::bail!(
                    "input.time_column and input.value_column are both {}",
                    input.time_column
                );
            }
            if input.kind == ValueKind::Temperature && input.power_step.is_none() {
                anyhow::bail!("input.kind = \"temperature\" requires an [input.power_step] section");
            }
        }
        (None, Some(theoretical)) => validate_theoretical(theoretical)?,
        (Some(_), Some(_)) => anyhow::bail!("[input] and [theoretical] are mutually exclusive"),
        (None, None) => anyhow::bail!("configuration needs an [input] or a [theoretical] section"),
    }

    let d = &config.derivative;
    if !(d.min_length > 0.0 && d.max_length >= d.min_length) {
        anyhow::bail!(
            "derivative window must satisfy 0 < min_length <= max_length (got {} and {})",
            d.min_length,
            d.max_length
        );
    }
    if !(d.increment > 0.0) {
        anyhow::bail!("derivative.increment must be positive, got {}", d.increment);
    }
    if !(d.expected_var > 0.0) {
        anyhow::bail!("derivative.expected_var must be positive, got {}", d.expected_var);
    }
    if d.grid_size < 4 {
        anyhow::bail!("derivative.grid_size must be at least 4, got {}", d.grid_size);
    }
    for (name, fraction) in [("pad_pre", d.pad_pre), ("pad_after", d.pad_after)] {
        if !(0.0..1.0).contains(&fraction) {
            anyhow::bail!("derivative.{} must lie in [0, 1), got {}", name, fraction);
        }
    }

    let deconv = &config.deconvolution;
    match deconv.method {
        DeconvolutionKind::Fourier => {
            if !(deconv.filter.cutoff > 0.0) {
                anyhow::bail!(
                    "deconvolution.filter.cutoff must be positive (cycles per unit ln t), got {}",
                    deconv.filter.cutoff
                );
            }
        }
        DeconvolutionKind::Bayesian => {
            if deconv.steps == 0 {
                anyhow::bail!("deconvolution.steps must be at least 1");
            }
        }
        DeconvolutionKind::Lasso => {
            let lasso = &deconv.lasso;
            if let Some(alpha) = lasso.alpha {
                if !(alpha > 0.0) {
                    anyhow::bail!("deconvolution.lasso.alpha must be positive, got {}", alpha);
                }
            } else if lasso.folds < 2 || lasso.alphas == 0 {
                anyhow::bail!(
                    "cross-validated lasso needs folds >= 2 and alphas >= 1 (got {} and {})",
                    lasso.folds,
                    lasso.alphas
                );
            }
            if lasso.tau_grid == TauGridName::LogSpaced && lasso.tau_count < 2 {
                anyhow::bail!("deconvolution.lasso.tau_count must be at least 2");
            }
            if lasso.hybrid && deconv.steps == 0 {
                anyhow::bail!("hybrid lasso needs deconvolution.steps >= 1 for its prior");
            }
        }
    }

    if config.foster.interpolation_factor == 0 {
        anyhow::bail!("foster.interpolation_factor must be at least 1");
    }
    if !(config.foster.zero_floor >= 0.0) {
        anyhow::bail!("foster.zero_floor must be non-negative, got {}", config.foster.zero_floor);
    }

    let cauer = &config.cauer;
    if cauer.precision_bits < MIN_PRECISION_BITS {
        anyhow::bail!(
            "cauer.precision_bits must be at least {}, got {}",
            MIN_PRECISION_BITS,
            cauer.precision_bits
        );
    }
    if cauer.blockwise_sum_width == 0 {
        anyhow::bail!("cauer.blockwise_sum_width must be at least 1");
    }
    if !(cauer.merge_tolerance >= 0.0) {
        anyhow::bail!("cauer.merge_tolerance must be non-negative, got {}", cauer.merge_tolerance);
    }

    if !(config.output.capacitance_limit > 0.0) {
        anyhow::bail!(
            "output.capacitance_limit must be positive, got {}",
            config.output.capacitance_limit
        );
    }

    if let Some(bootstrap) = &config.bootstrap {
        if bootstrap.repetitions < 2 {
            anyhow::bail!("bootstrap.repetitions must be at least 2, got {}", bootstrap.repetitions);
        }
        if !(bootstrap.signal_to_noise > 0.0) {
            anyhow::bail!("bootstrap.signal_to_noise must be positive, got {}", bootstrap.signal_to_noise);
        }
        let (lower, upper) = (bootstrap.lower_percentile, bootstrap.upper_percentile);
        if !(0.0 <= lower && lower <= upper && upper <= 100.0) {
            anyhow::bail!(
                "bootstrap percentiles must satisfy 0 <= lower <= upper <= 100 (got {} and {})",
                lower,
                upper
            );
        }
        if bootstrap.structure_points < 2 {
            anyhow::bail!("bootstrap.structure_points must be at least 2");
        }
    }

    if let Some(prediction) = &config.prediction {
        if prediction.time_column == prediction.power_column {
            anyhow::bail!(
                "prediction.time_column and prediction.power_column are both {}",
                prediction.time_column
            );
        }
        if !(prediction.sampling_period > 0.0) {
            anyhow::bail!(
                "prediction.sampling_period must be positive, got {}",
                prediction.sampling_period
            );
        }
    }

    if let Some(sweep) = &config.sweep {
        if sweep.values.is_empty() {
            anyhow::bail!("sweep.values is empty");
        }
        for &value in &sweep.values {
            let mut swept = config.clone();
            swept.sweep = None;
            sweep
                .parameter
                .apply(&mut swept, value)
                .and_then(|()| validate_config(&swept))
                .with_context(|| format!("sweep {} = {}", sweep.parameter.name(), value))?;
        }
    }

    Ok(())
}

fn validate_theoretical(theoretical: &TheoreticalSection) -> Result<()> {
    if theoretical.resistance.is_empty() || theoretical.resistance.len() != theoretical.capacitance.len() {
        anyhow::bail!(
            "theoretical needs matching, non-empty resistance and capacitance lists (got {} and {})",
            theoretical.resistance.len(),
            theoretical.capacitance.len()
        );
    }
    let [start, end] = theoretical.log_time;
    if !(start < end) {
        anyhow::bail!("theoretical.log_time must be increasing, got [{}, {}]", start, end);
    }
    if theoretical.samples < 10 {
        anyhow::bail!("theoretical.samples must be at least 10, got {}", theoretical.samples);
    }
    if !(theoretical.delta_degrees > 0.0 && theoretical.delta_degrees < 90.0) {
        anyhow::bail!(
            "theoretical.delta_degrees must lie in (0, 90), got {}",
            theoretical.delta_degrees
        );
    }
    if !(theoretical.added_noise >= 0.0 && theoretical.added_noise.is_finite()) {
        anyhow::bail!("theoretical.added_noise must be non-negative, got {}", theoretical.added_noise);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [input]
        path = "transient.txt"
    "#;

    #[test]
    fn test_defaults() {
        let config = parse_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "analysis");
        assert_eq!(config.input.as_ref().unwrap().value_column, 1);
        assert!(config.theoretical.is_none());
        assert!(config.bootstrap.is_none());
        assert!(config.prediction.is_none());
        assert!(config.sweep.is_none());
        assert_eq!(config.deconvolution.method(), DeconvolutionMethod::Bayesian { steps: 1000 });
        assert_eq!(config.derivative.grid_size, 250);
        assert_eq!(config.derivative.min_points, 70);

        let cauer = config.cauer.to_config().unwrap();
        assert_eq!(cauer.method, CauerMethod::Sobhy);
        assert_eq!(cauer.precision.bits(), 250);
        assert_eq!(config.output.capacitance_limit, 1e4);
        assert_eq!(config.foster.zero_floor, 1e-10);
    }

    #[test]
    fn test_full_toml() {
        let config = parse_toml(
            r#"
            name = "mosfet"

            [input]
            path = "data/cooling.txt"
            skip_rows = 2
            kind = "temperature"
            t_zero = 85.0

            [input.power_step]
            power = 2.5
            optical_power = 0.5

            [derivative]
            grid_size = 300
            min_points = 40

            [deconvolution]
            method = "fourier"

            [deconvolution.filter]
            kind = "blackman_harris"
            cutoff = 0.8

            [cauer]
            method = "lanczos"
            precision_bits = 1024
            blockwise_sum_width = 4
            "#,
        )
        .unwrap();

        let input = config.input.unwrap();
        assert_eq!(input.kind, ValueKind::Temperature);
        let step = input.power_step.unwrap();
        assert_eq!(step.effective().0, 2.0);
        assert_eq!(config.derivative.grid_size, 300);
        assert_eq!(config.derivative.max_length, 3.0);

        match config.deconvolution.method() {
            DeconvolutionMethod::Fourier(filter) => {
                assert_eq!(filter.kind, FilterKind::BlackmanHarris);
                assert_eq!(filter.cutoff, 0.8);
            }
            other => panic!("unexpected method {:?}", other),
        }

        let cauer = config.cauer.to_config().unwrap();
        assert_eq!(
            cauer.method,
            CauerMethod::Lanczos {
                blockwise_sum_width: 4
            }
        );
        assert_eq!(cauer.precision.bits(), 1024);
    }

    #[test]
    fn test_lasso_section() {
        let config = parse_toml(
            r#"
            [input]
            path = "x.txt"

            [deconvolution]
            method = "lasso"
            steps = 300

            [deconvolution.lasso]
            tau_grid = "log_spaced"
            tau_count = 64
            alpha = 1e-4
            hybrid = true
            "#,
        )
        .unwrap();

        let DeconvolutionMethod::Lasso(lasso) = config.deconvolution.method() else {
            panic!("expected lasso");
        };
        assert_eq!(lasso.tau_grid, TauGrid::LogSpaced { count: 64 });
        assert_eq!(lasso.penalty, Penalty::Fixed(1e-4));
        assert!(lasso.hybrid);
        assert_eq!(lasso.prior_steps, 300);
    }

    #[test]
    fn test_json() {
        let config = parse_json(
            r#"{"input": {"path": "t.txt"}, "cauer": {"method": "boor_golub", "precision_bits": 128}}"#,
        )
        .unwrap();
        assert_eq!(config.cauer.method, CauerKind::BoorGolub);
        assert_eq!(config.cauer.to_config().unwrap().method, CauerMethod::BoorGolub);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let misspelled = r#"
            [input]
            path = "t.txt"

            [cauer]
            presicion_bits = 500
        "#;
        assert!(parse_toml(misspelled).is_err());

        let unknown_method = r#"
            [input]
            path = "t.txt"

            [cauer]
            method = "euclid"
        "#;
        assert!(parse_toml(unknown_method).is_err());
    }

    #[test]
    fn test_validation() {
        let bad = [
            "[input]\npath = \"t\"\n[cauer]\nprecision_bits = 16",
            "[input]\npath = \"t\"\n[derivative]\nmin_length = 2.0\nmax_length = 1.0",
            "[input]\npath = \"t\"\n[derivative]\npad_pre = 1.5",
            "[input]\npath = \"t\"\n[foster]\ninterpolation_factor = 0",
            "[input]\npath = \"t\"\n[deconvolution]\nmethod = \"fourier\"\n[deconvolution.filter]\ncutoff = 0.0",
            "[input]\npath = \"t\"\nkind = \"temperature\"",
            "[input]\npath = \"t\"\ntime_column = 1",
            "[derivative]\ngrid_size = 100",
            "[input]\npath = \"t\"\n[theoretical]\nresistance = [1.0]\ncapacitance = [1.0]",
            "[theoretical]\nresistance = [1.0, 2.0]\ncapacitance = [1.0]",
            "[theoretical]\nresistance = [1.0]\ncapacitance = [1.0]\nlog_time = [2.0, -2.0]",
            "[input]\npath = \"t\"\n[bootstrap]\nrepetitions = 1",
            "[input]\npath = \"t\"\n[bootstrap]\nlower_percentile = 90.0\nupper_percentile = 10.0",
            "[input]\npath = \"t\"\n[prediction]\npath = \"p\"\nsampling_period = 0.0",
            "[input]\npath = \"t\"\n[sweep]\nparameter = \"precision_bits\"\nvalues = [250.0, 16.0]",
            "[input]\npath = \"t\"\n[sweep]\nparameter = \"grid_size\"\nvalues = [100.5]",
            "[input]\npath = \"t\"\n[sweep]\nparameter = \"grid_size\"\nvalues = []",
        ];
        for content in bad {
            assert!(parse_toml(content).is_err(), "accepted: {}", content);
        }
    }

    #[test]
    fn test_optional_stage_sections() {
        let config = parse_toml(
            r#"
            [theoretical]
            resistance = [0.5, 1.0]
            capacitance = [1e-3, 0.1]
            length = [1e-4, 2e-4]
            added_noise = 1e-4

            [bootstrap]
            repetitions = 20
            signal_to_noise = 50.0
            source = "model"

            [prediction]
            path = "pulses.csv"
            sampling_period = 1e-2

            [sweep]
            parameter = "deconvolution_steps"
            values = [50, 1000, 10000]
            "#,
        )
        .unwrap();

        assert!(config.input.is_none());
        let theoretical = config.theoretical.unwrap();
        assert_eq!(theoretical.log_time, [-20.0, 10.0]);
        assert_eq!(theoretical.samples, 30_000);
        assert_eq!(theoretical.delta_degrees, 0.5);
        assert_eq!(theoretical.length, Some(vec![1e-4, 2e-4]));

        let bootstrap = config.bootstrap.unwrap();
        assert_eq!(bootstrap.repetitions, 20);
        assert_eq!(bootstrap.source, BootstrapSource::Model);
        assert_eq!(bootstrap.upper_percentile, 95.0);

        let prediction = config.prediction.unwrap();
        assert_eq!(prediction.power_column, 1);
        assert_eq!(prediction.sampling_period, 1e-2);

        let sweep = config.sweep.unwrap();
        assert_eq!(sweep.parameter, SweepParameter::DeconvolutionSteps);
        assert_eq!(sweep.values, vec![50.0, 1000.0, 10000.0]);
    }

    #[test]
    fn test_sweep_apply() {
        let mut config = parse_toml(MINIMAL).unwrap();
        SweepParameter::PrecisionBits.apply(&mut config, 512.0).unwrap();
        SweepParameter::FilterCutoff.apply(&mut config, 0.7).unwrap();
        SweepParameter::LassoAlpha.apply(&mut config, 1e-3).unwrap();
        assert_eq!(config.cauer.precision_bits, 512);
        assert_eq!(config.deconvolution.filter.cutoff, 0.7);
        assert_eq!(config.deconvolution.lasso.alpha, Some(1e-3));
        assert!(SweepParameter::GridSize.apply(&mut config, -3.0).is_err());
        assert!(SweepParameter::DeconvolutionSteps.apply(&mut config, 2.5).is_err());
    }

    #[test]
    fn test_relative_input_path_resolved() {
        let dir = std::env::temp_dir().join(format!("rth-kernel-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("curve.txt"), "1 0\n2 1\n").unwrap();
        let config_path = dir.join("analysis.toml");
        std::fs::write(&config_path, "[input]\npath = \"curve.txt\"\n").unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.input.unwrap().path, dir.join("curve.txt"));

        std::fs::write(dir.join("power.txt"), "0 1\n1 1\n").unwrap();
        std::fs::write(
            &config_path,
            "[input]\npath = \"curve.txt\"\n[prediction]\npath = \"power.txt\"\n",
        )
        .unwrap();
        let config = load_config(&config_path).unwrap();
        assert_eq!(config.prediction.unwrap().path, dir.join("power.txt"));

        std::fs::write(&config_path, "[input]\npath = \"missing.txt\"\n").unwrap();
        assert!(load_config(&config_path).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
