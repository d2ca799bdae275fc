//! Seeded measurement noise for resampling studies.

use crate::error::{DspError, DspResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Add zero-mean Gaussian noise of standard deviation `sigma`.
///
/// The same `seed` always yields the same noise. `sigma == 0` returns the
/// input unchanged.
pub fn add_gaussian_noise(values: &[f64], sigma: f64, seed: u64) -> DspResult<Vec<f64>> {
    if sigma == 0.0 {
        return Ok(values.to_vec());
    }
    if !sigma.is_finite() {
        return Err(DspError::InvalidParameter(format!("noise sigma must be finite, got {}", sigma)));
    }
    let normal = Normal::new(0.0, sigma)
        .map_err(|e| DspError::InvalidParameter(format!("noise sigma {}: {}", sigma, e)))?;

    let mut rng = StdRng::seed_from_u64(seed);
    Ok(values.iter().map(|v| v + normal.sample(&mut rng)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sigma_is_identity() {
        let values = vec![1.0, 2.0, 3.0];
        assert_eq!(add_gaussian_noise(&values, 0.0, 7).unwrap(), values);
    }

    #[test]
    fn test_seed_reproducible() {
        let values = vec![0.0; 64];
        let a = add_gaussian_noise(&values, 0.1, 42).unwrap();
        let b = add_gaussian_noise(&values, 0.1, 42).unwrap();
        let c = add_gaussian_noise(&values, 0.1, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sample_moments() {
        let n = 20_000;
        let noisy = add_gaussian_noise(&vec![5.0; n], 0.5, 1).unwrap();
        let mean = noisy.iter().sum::<f64>() / n as f64;
        let var = noisy.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        assert!((mean - 5.0).abs() < 0.02, "mean = {}", mean);
        assert!((var.sqrt() - 0.5).abs() < 0.02, "std = {}", var.sqrt());
    }

    #[test]
    fn test_rejects_bad_sigma() {
        assert!(add_gaussian_noise(&[1.0], -1.0, 0).is_err());
        assert!(add_gaussian_noise(&[1.0], f64::NAN, 0).is_err());
        assert!(add_gaussian_noise(&[1.0], f64::INFINITY, 0).is_err());
    }
}
