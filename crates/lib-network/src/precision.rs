//! Arbitrary-precision arithmetic context.
//!
//! Every multiprecision value used by the Cauer synthesis is created through a
//! [`Precision`], which carries the mantissa width explicitly. Arithmetic on
//! two values of the same precision keeps that precision, so a transform never
//! depends on process-wide numeric state and independent transforms can run
//! concurrently.

use crate::error::{NetworkError, NetworkResult};
use dashu_float::round::mode::HalfEven;
use dashu_float::FBig;

/// Binary floating point with half-even rounding.
pub type Real = FBig<HalfEven, 2>;

/// Default mantissa width in bits.
pub const DEFAULT_PRECISION_BITS: usize = 250;

/// Anything narrower than an `f64` mantissa defeats the purpose.
pub const MIN_PRECISION_BITS: usize = 53;

/// Mantissa width of the values a transform works with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Precision {
    bits: usize,
}

impl Precision {
    pub fn new(bits: usize) -> NetworkResult<Self> {
        if bits < MIN_PRECISION_BITS {
            return Err(NetworkError::InvalidPrecision {
                bits,
                min: MIN_PRECISION_BITS,
            });
        }
        Ok(Self { bits })
    }

    #[inline]
    pub fn bits(self) -> usize {
        self.bits
    }

    /// Exact conversion of `value`, widened to this precision.
    pub fn real(self, value: f64) -> NetworkResult<Real> {
        let exact = Real::try_from(value).map_err(|_| NetworkError::NonFinite(value))?;
        Ok(exact.with_precision(self.bits).value())
    }

    pub fn reals(self, values: &[f64]) -> NetworkResult<Vec<Real>> {
        values.iter().map(|&v| self.real(v)).collect()
    }

    pub fn zero(self) -> Real {
        Real::ZERO.with_precision(self.bits).value()
    }

    pub fn one(self) -> Real {
        Real::ONE.with_precision(self.bits).value()
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            bits: DEFAULT_PRECISION_BITS,
        }
    }
}

#[inline]
pub fn is_zero(x: &Real) -> bool {
    x.repr().is_zero()
}

/// `num / den`, or `None` when `den` is exactly zero.
#[inline]
pub fn checked_div(num: &Real, den: &Real) -> Option<Real> {
    if is_zero(den) {
        None
    } else {
        Some(num / den)
    }
}

/// Nearest `f64`.
#[inline]
pub fn to_f64(x: &Real) -> f64 {
    x.to_f64().value()
}

pub fn to_f64_vec(values: &[Real]) -> Vec<f64> {
    values.iter().map(to_f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_narrow_precision() {
        assert!(matches!(
            Precision::new(32),
            Err(NetworkError::InvalidPrecision { bits: 32, min: 53 })
        ));
        assert_eq!(Precision::new(53).unwrap().bits(), 53);
        assert_eq!(Precision::default().bits(), 250);
    }

    #[test]
    fn test_conversion_is_exact() {
        let p = Precision::new(128).unwrap();
        for v in [0.0, 1.0, -2.5, 1e-300, 6.02e23] {
            assert_eq!(to_f64(&p.real(v).unwrap()), v);
        }
        assert!(matches!(p.real(f64::NAN), Err(NetworkError::NonFinite(_))));
        assert!(p.real(f64::INFINITY).is_err());
    }

    #[test]
    fn test_extra_bits_survive_cancellation() {
        // (1 + 2^-80) − 1 vanishes in f64 but not at 128 bits.
        let p = Precision::new(128).unwrap();
        let tiny = p.real(2f64.powi(-80)).unwrap();
        let sum = &p.one() + &tiny;
        let diff = &sum - &p.one();
        assert_eq!(to_f64(&diff), 2f64.powi(-80));
    }

    #[test]
    fn test_checked_div() {
        let p = Precision::default();
        let one = p.one();
        assert!(checked_div(&one, &p.zero()).is_none());
        let half = checked_div(&one, &p.real(2.0).unwrap()).unwrap();
        assert_eq!(to_f64(&half), 0.5);
    }
}
