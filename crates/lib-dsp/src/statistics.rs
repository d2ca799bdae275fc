//! Pointwise statistics across repeated curves.

use crate::error::{DspError, DspResult};

/// Percentile of `values` with linear interpolation between order statistics.
///
/// `percent` is clamped to `[0, 100]`. NaN entries sort last.
pub fn percentile(values: &[f64], percent: f64) -> DspResult<f64> {
    if values.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(percentile_sorted(&sorted, percent))
}

fn percentile_sorted(sorted: &[f64], percent: f64) -> f64 {
    let position = percent.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = (below + 1).min(sorted.len() - 1);
    let frac = position - below as f64;
    sorted[below] + frac * (sorted[above] - sorted[below])
}

/// Median and percentile envelope of a family of curves on a shared grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Band {
    pub median: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Band {
    /// Pointwise statistics of `curves`; all curves must have the same length.
    pub fn across(curves: &[Vec<f64>], lower_percent: f64, upper_percent: f64) -> DspResult<Self> {
        let first = curves.first().ok_or(DspError::InsufficientData { needed: 1, got: 0 })?;
        let n = first.len();
        if let Some(bad) = curves.iter().find(|c| c.len() != n) {
            return Err(DspError::LengthMismatch {
                expected: n,
                actual: bad.len(),
            });
        }
        if !(lower_percent <= upper_percent) {
            return Err(DspError::InvalidParameter(format!(
                "lower percentile {} exceeds upper percentile {}",
                lower_percent, upper_percent
            )));
        }

        let mut band = Self {
            median: Vec::with_capacity(n),
            lower: Vec::with_capacity(n),
            upper: Vec::with_capacity(n),
        };
        let mut column = Vec::with_capacity(curves.len());
        for i in 0..n {
            column.clear();
            column.extend(curves.iter().map(|c| c[i]));
            column.sort_by(f64::total_cmp);
            band.median.push(percentile_sorted(&column, 50.0));
            band.lower.push(percentile_sorted(&column, lower_percent));
            band.upper.push(percentile_sorted(&column, upper_percent));
        }
        Ok(band)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.median.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.median.is_empty()
    }

    /// Largest `upper − lower` over the grid.
    pub fn max_width(&self) -> f64 {
        self.upper
            .iter()
            .zip(self.lower.iter())
            .map(|(u, l)| u - l)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&values, 50.0).unwrap(), 3.0);
        assert_eq!(percentile(&values, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&values, 100.0).unwrap(), 5.0);
        assert!((percentile(&values, 10.0).unwrap() - 1.4).abs() < 1e-12);
        assert_eq!(percentile(&[7.0], 95.0).unwrap(), 7.0);
        assert!(percentile(&[], 50.0).is_err());
    }

    #[test]
    fn test_band_across_curves() {
        let curves: Vec<Vec<f64>> = (0..11).map(|k| vec![k as f64, 10.0 - k as f64, 1.0]).collect();
        let band = Band::across(&curves, 10.0, 90.0).unwrap();

        assert_eq!(band.len(), 3);
        assert_eq!(band.median, vec![5.0, 5.0, 1.0]);
        assert_eq!(band.lower, vec![1.0, 1.0, 1.0]);
        assert_eq!(band.upper, vec![9.0, 9.0, 1.0]);
        assert_eq!(band.max_width(), 8.0);
    }

    #[test]
    fn test_band_rejects_ragged_input() {
        let curves = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(Band::across(&curves, 5.0, 95.0).is_err());
        assert!(Band::across(&[], 5.0, 95.0).is_err());
        assert!(Band::across(&[vec![1.0]], 95.0, 5.0).is_err());
    }
}
