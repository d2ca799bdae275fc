//! Result output formatting and writing.

use crate::orchestrator::AnalysisResults;
use crate::OutputFormat;
use anyhow::Result;
use lib_dsp::Band;
use lib_network::{CauerSynthesis, RESISTANCE_DRIFT_TOLERANCE};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Named columns; output runs to the shortest one.
struct Table<'a> {
    columns: Vec<(&'a str, Vec<f64>)>,
}

impl<'a> Table<'a> {
    fn new() -> Self {
        Self { columns: Vec::new() }
    }

    fn column(mut self, name: &'a str, values: Vec<f64>) -> Self {
        self.columns.push((name, values));
        self
    }

    fn rows(&self) -> usize {
        self.columns.iter().map(|(_, v)| v.len()).min().unwrap_or(0)
    }

    fn write(&self, out: &mut impl Write, format: OutputFormat) -> Result<()> {
        let rows = self.rows();
        match format {
            OutputFormat::Text => {
                let header: Vec<String> = self.columns.iter().map(|(name, _)| format!("{:>16}", name)).collect();
                writeln!(out, "{}", header.join(" "))?;
                for i in 0..rows {
                    let line: Vec<String> = self.columns.iter().map(|(_, v)| format!("{:>16.8e}", v[i])).collect();
                    writeln!(out, "{}", line.join(" "))?;
                }
            }
            OutputFormat::Csv => {
                let header: Vec<&str> = self.columns.iter().map(|(name, _)| *name).collect();
                writeln!(out, "{}", header.join(","))?;
                for i in 0..rows {
                    let line: Vec<String> = self.columns.iter().map(|(_, v)| v[i].to_string()).collect();
                    writeln!(out, "{}", line.join(","))?;
                }
            }
            OutputFormat::Json => {
                let object: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .map(|(name, v)| (name.to_string(), serde_json::json!(&v[..rows])))
                    .collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&object)?)?;
            }
        }
        Ok(())
    }

    fn write_file(&self, dir: &Path, stem: &str, format: OutputFormat) -> Result<PathBuf> {
        let path = dir.join(format!("{}.{}", stem, extension(format)));
        let mut f = std::io::BufWriter::new(std::fs::File::create(&path)?);
        self.write(&mut f, format)?;
        f.flush()?;
        tracing::info!("Wrote {} rows to {:?}", self.rows(), path);
        Ok(path)
    }
}

fn extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Text => "txt",
        OutputFormat::Csv => "csv",
        OutputFormat::Json => "json",
    }
}

fn ladder_table(cauer: &CauerSynthesis) -> Table<'static> {
    let network = &cauer.network;
    Table::new()
        .column("rung", (0..network.len()).map(|i| i as f64).collect())
        .column("resistance", network.resistance.clone())
        .column("capacitance", network.capacitance.clone())
}

fn band_table<'a>(grid_name: &'a str, grid: &[f64], band: &Band) -> Table<'a> {
    Table::new()
        .column(grid_name, grid.to_vec())
        .column("median", band.median.clone())
        .column("lower", band.lower.clone())
        .column("upper", band.upper.clone())
}

/// Write analysis results to the output directory.
pub fn write_results(results: &AnalysisResults, output_dir: &Path, format: OutputFormat) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let estimate = &results.estimate;
    Table::new()
        .column("ln_t", estimate.log_time.clone())
        .column("impedance", estimate.smoothed.clone())
        .column("derivative", estimate.derivative.clone())
        .column("window", estimate.window.clone())
        .write_file(output_dir, "derivative", format)?;

    let spectrum = &results.deconvolution.spectrum;
    Table::new()
        .column("ln_tau", spectrum.log_tau.clone())
        .column("tau", spectrum.tau())
        .column("amplitude", spectrum.amplitude.clone())
        .column("cumulative", results.deconvolution.cumulative.clone())
        .write_file(output_dir, "time_constant_spectrum", format)?;

    let forward = &results.forward;
    Table::new()
        .column("ln_t", forward.log_time.clone())
        .column("derivative", forward.derivative.clone())
        .column("impedance", forward.impedance.clone())
        .write_file(output_dir, "back_calculated", format)?;

    let foster = &results.foster;
    Table::new()
        .column("ln_tau", foster.spectrum.log_tau.clone())
        .column("resistance", foster.network.resistance.clone())
        .column("capacitance", foster.network.capacitance.clone())
        .write_file(output_dir, "foster", format)?;

    ladder_table(&results.cauer).write_file(output_dir, "cauer", format)?;

    // The differential table is one row shorter.
    let structure = results.displayed_structure();
    Table::new()
        .column("cumulative_resistance", structure.cumulative_resistance.clone())
        .column("cumulative_capacitance", structure.cumulative_capacitance.clone())
        .write_file(output_dir, "structure_function", format)?;
    Table::new()
        .column("cumulative_resistance", structure.cumulative_resistance.clone())
        .column("differential", structure.differential.clone())
        .write_file(output_dir, "differential_structure", format)?;

    if let Some(reference) = &results.theoretical {
        let spectrum = &reference.spectrum;
        Table::new()
            .column("ln_tau", spectrum.log_tau.clone())
            .column("amplitude", spectrum.amplitude.clone())
            .column("derivative", reference.forward.derivative.clone())
            .column("impedance", reference.forward.impedance.clone())
            .write_file(output_dir, "theoretical_spectrum", format)?;

        let profile = &reference.profile;
        Table::new()
            .column("cumulative_resistance", profile.structure.cumulative_resistance.clone())
            .column("cumulative_capacitance", profile.structure.cumulative_capacitance.clone())
            .column("position", profile.position.clone())
            .write_file(output_dir, "theoretical_structure", format)?;
        Table::new()
            .column("cumulative_resistance", profile.structure.cumulative_resistance.clone())
            .column("differential", profile.structure.differential.clone())
            .write_file(output_dir, "theoretical_differential_structure", format)?;
    }

    if let Some(bootstrap) = &results.bootstrap {
        band_table("ln_t", &bootstrap.log_time, &bootstrap.impedance)
            .write_file(output_dir, "bootstrap_impedance", format)?;
        band_table("ln_t", &bootstrap.log_time, &bootstrap.derivative)
            .write_file(output_dir, "bootstrap_derivative", format)?;
        band_table("ln_tau", &bootstrap.log_tau, &bootstrap.spectrum)
            .write_file(output_dir, "bootstrap_spectrum", format)?;
        band_table("ln_tau", &bootstrap.log_tau, &bootstrap.cumulative_spectrum)
            .write_file(output_dir, "bootstrap_cumulative_spectrum", format)?;
        if let Some(structure) = &bootstrap.structure {
            band_table("cumulative_resistance", &structure.cumulative_resistance, &structure.cumulative_capacitance)
                .write_file(output_dir, "bootstrap_structure", format)?;
        }
        Table::new()
            .column("run", (0..bootstrap.runs.len()).map(|i| i as f64).collect())
            .column("total_resistance", bootstrap.runs.iter().map(|r| r.total_resistance).collect())
            .column("total_capacitance", bootstrap.runs.iter().map(|r| r.total_capacitance).collect())
            .column("rungs", bootstrap.runs.iter().map(|r| r.rungs as f64).collect())
            .column("negative_count", bootstrap.runs.iter().map(|r| r.negative_count as f64).collect())
            .write_file(output_dir, "bootstrap_runs", format)?;
    }

    if let Some(prediction) = &results.prediction {
        Table::new()
            .column("time", prediction.time.clone())
            .column("power", prediction.power.clone())
            .column("step_response", prediction.step_response.clone())
            .column("impulse_response", prediction.impulse_response.clone())
            .column("temperature_rise", prediction.temperature_rise.clone())
            .write_file(output_dir, "temperature_prediction", format)?;
    }

    if !results.sweep.is_empty() {
        let runs = &results.sweep;
        Table::new()
            .column("value", runs.iter().map(|run| run.value).collect())
            .column("rungs", runs.iter().map(|run| run.results.cauer.network.len() as f64).collect())
            .column("total_resistance", runs.iter().map(|run| run.results.cauer.network.total_resistance().0).collect())
            .column("total_capacitance", runs.iter().map(|run| run.results.cauer.network.total_capacitance().0).collect())
            .column("negative_count", runs.iter().map(|run| run.results.cauer.negative_count as f64).collect())
            .column("resistance_drift", runs.iter().map(|run| run.results.cauer.resistance_drift).collect())
            .write_file(output_dir, "sweep_summary", format)?;
        for (index, run) in runs.iter().enumerate() {
            write_results(&run.results, &output_dir.join("sweep").join(format!("{:03}", index)), format)?;
        }
    }

    let summary_path = output_dir.join("summary.txt");
    let mut f = std::fs::File::create(&summary_path)?;
    write_summary(&mut f, results)?;
    tracing::info!("Wrote summary to {:?}", summary_path);

    Ok(())
}

fn write_summary(out: &mut impl Write, results: &AnalysisResults) -> Result<()> {
    let network = &results.cauer.network;

    writeln!(out, "Thermal Structure Function: {}", results.name)?;
    writeln!(out, "============================")?;
    writeln!(out)?;
    writeln!(out, "Spectrum samples:     {}", results.deconvolution.spectrum.len())?;
    writeln!(out, "Negative samples:     {}", results.deconvolution.spectrum.negative_count())?;
    writeln!(out, "Spectrum peak:        {:.6e} K/W", results.deconvolution.spectrum.peak())?;
    writeln!(out, "Foster pairs:         {}", results.foster.network.len())?;
    writeln!(out, "Distinct poles:       {}", results.cauer.foster_order)?;
    writeln!(out, "Cauer rungs:          {}", network.len())?;
    writeln!(out, "Total resistance:     {:.6} K/W", network.total_resistance().0)?;
    writeln!(out, "Total capacitance:    {:.6e} J/K", network.total_capacitance().0)?;
    writeln!(out, "Resistance drift:     {:.2e}", results.cauer.resistance_drift)?;
    if let Some(reference) = &results.theoretical {
        writeln!(out, "Model resistance:     {:.6} K/W", reference.ladder.total_resistance())?;
    }
    if let Some(bootstrap) = &results.bootstrap {
        let total = bootstrap.total_resistance()?;
        writeln!(
            out,
            "Bootstrap R_th:       {:.6} K/W [{:.6}, {:.6}] over {} runs",
            total.median[0],
            total.lower[0],
            total.upper[0],
            bootstrap.runs.len()
        )?;
    }
    if let Some(prediction) = &results.prediction {
        writeln!(out, "Predicted peak rise:  {:.4} K", prediction.peak())?;
    }
    if !results.sweep.is_empty() {
        writeln!(out, "Sweep runs:           {}", results.sweep.len())?;
    }
    writeln!(out)?;

    let drifted = results.cauer.resistance_drift > RESISTANCE_DRIFT_TOLERANCE;
    if results.cauer.negative_count == 0 && results.cauer.truncated_at.is_none() && !drifted {
        writeln!(out, "Status: OK - all ladder elements non-negative")?;
    } else {
        if results.cauer.negative_count > 0 {
            writeln!(
                out,
                "Status: WARNING - {} negative elements (first at rung {:?}); increase precision_bits",
                results.cauer.negative_count,
                network.first_invalid_rung()
            )?;
        }
        if let Some(rung) = results.cauer.truncated_at {
            writeln!(out, "Status: WARNING - ladder truncated at rung {}", rung)?;
        }
        if drifted {
            writeln!(out, "Status: WARNING - ladder total resistance differs from the Foster total")?;
        }
    }
    Ok(())
}

/// Print results to stdout.
pub fn print_results(results: &AnalysisResults) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out)?;
    write_summary(&mut out, results)?;
    writeln!(out)?;
    Ok(())
}

/// Print a synthesized ladder to stdout.
pub fn print_ladder(cauer: &CauerSynthesis, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    ladder_table(cauer).write(&mut out, format)?;
    if format == OutputFormat::Text {
        writeln!(out)?;
        writeln!(out, "Total resistance: {:.6} K/W", cauer.network.total_resistance().0)?;
        if cauer.negative_count > 0 {
            writeln!(out, "Negative elements: {}", cauer.negative_count)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table<'static> {
        Table::new()
            .column("a", vec![1.0, 2.5])
            .column("b", vec![-3.0, 4.0, 99.0])
    }

    fn render(format: OutputFormat) -> String {
        let mut buf = Vec::new();
        table().write(&mut buf, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_csv() {
        assert_eq!(render(OutputFormat::Csv), "a,b\n1,-3\n2.5,4\n");
    }

    #[test]
    fn test_json_truncates_to_shortest_column() {
        let value: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(value["a"], serde_json::json!([1.0, 2.5]));
        assert_eq!(value["b"], serde_json::json!([-3.0, 4.0]));
    }

    #[test]
    fn test_band_table_columns() {
        let band = Band {
            median: vec![1.0, 2.0],
            lower: vec![0.5, 1.5],
            upper: vec![1.5, 2.5],
        };
        let mut buf = Vec::new();
        band_table("ln_t", &[-1.0, 0.0], &band).write(&mut buf, OutputFormat::Csv).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "ln_t,median,lower,upper\n-1,1,0.5,1.5\n0,2,1.5,2.5\n"
        );
    }

    #[test]
    fn test_text() {
        let text = render(OutputFormat::Text);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].trim_start().starts_with('a'));
        let parsed: Vec<f64> = lines[2].split_whitespace().map(|f| f.parse().unwrap()).collect();
        assert_eq!(parsed, vec![2.5, 4.0]);
    }
}
