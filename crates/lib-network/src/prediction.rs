//! Temperature response to an arbitrary power profile.
//!
//! The power is resampled onto a uniform grid and held constant over each
//! sampling period. Superposing the Foster step response over those steps
//! is a discrete convolution with the impulse response
//! `h[k] = (Z(t_{k+1}) − Z(t_k)) / Δt`.

use crate::error::{NetworkError, NetworkResult};
use lib_dsp::convolution::fft_convolve;
use lib_dsp::interpolation::interpolate_linear;
use lib_types::{FosterNetwork, Seconds};

/// Longest uniform grid a prediction will allocate.
pub const MAX_PREDICTION_SAMPLES: usize = 10_000_000;

/// Predicted temperature rise on the uniform grid.
#[derive(Clone, Debug)]
pub struct TemperaturePrediction {
    /// Uniform time grid starting at the first power sample.
    pub time: Vec<f64>,

    /// Power interpolated onto `time`.
    pub power: Vec<f64>,

    /// `Z(t − t₀)` of the network.
    pub step_response: Vec<f64>,

    /// K/(W·s)
    pub impulse_response: Vec<f64>,

    /// Temperature rise over the start of the profile, K.
    pub temperature_rise: Vec<f64>,
}

impl TemperaturePrediction {
    /// Largest predicted rise.
    pub fn peak(&self) -> f64 {
        self.temperature_rise.iter().copied().fold(0.0, f64::max)
    }
}

/// Predict the temperature rise of `network` driven by `(power_time, power)`.
pub fn predict_temperature(
    network: &FosterNetwork,
    power_time: &[f64],
    power: &[f64],
    sampling_period: f64,
) -> NetworkResult<TemperaturePrediction> {
    if network.is_empty() {
        return Err(NetworkError::EmptyNetwork);
    }
    if power_time.len() < 2 {
        return Err(lib_dsp::DspError::InsufficientData {
            needed: 2,
            got: power_time.len(),
        }
        .into());
    }
    if !(sampling_period > 0.0 && sampling_period.is_finite()) {
        return Err(NetworkError::InvalidParameter(format!(
            "sampling period must be positive, got {}",
            sampling_period
        )));
    }

    let t0 = power_time[0];
    let span = power_time[power_time.len() - 1] - t0;
    if !(span > 0.0) {
        return Err(NetworkError::InvalidParameter(format!(
            "power profile must run forward in time, spans {} s",
            span
        )));
    }
    // Tolerate `span / Δt` landing just below an integer.
    let samples = (span / sampling_period + 1e-9).floor() + 1.0;
    if !(samples <= MAX_PREDICTION_SAMPLES as f64) {
        return Err(NetworkError::InvalidParameter(format!(
            "power profile of {:.3e} s at {:.3e} s sampling needs {:.3e} samples (limit {})",
            span, sampling_period, samples, MAX_PREDICTION_SAMPLES
        )));
    }
    let samples = samples as usize;

    let time: Vec<f64> = (0..samples).map(|k| t0 + k as f64 * sampling_period).collect();
    let power = interpolate_linear(power_time, power, &time)?;

    let step: Vec<f64> = (0..=samples)
        .map(|k| network.impedance_at(Seconds(k as f64 * sampling_period)).0)
        .collect();
    let impulse_response: Vec<f64> = step.windows(2).map(|w| (w[1] - w[0]) / sampling_period).collect();

    let convolved = fft_convolve(&power, &impulse_response)?;
    let mut temperature_rise = Vec::with_capacity(samples);
    temperature_rise.push(0.0);
    temperature_rise.extend(convolved[..samples - 1].iter().map(|v| v * sampling_period));

    tracing::debug!(
        "temperature prediction: {} samples at {:.3e} s, peak rise {:.4} K",
        samples,
        sampling_period,
        temperature_rise.iter().copied().fold(0.0, f64::max)
    );

    Ok(TemperaturePrediction {
        time,
        power,
        step_response: step[..samples].to_vec(),
        impulse_response,
        temperature_rise,
    })
}
