//! Physical units with type safety.
//!
//! These newtypes keep thermal quantities apart at API boundaries
//! (e.g., a thermal resistance cannot be passed where a capacitance is expected).
//! Inner numeric kernels work on plain `f64` slices.

use serde::{Deserialize, Serialize};
use std::ops::{Div, Sub};

/// Time duration in seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(pub f64);

impl Seconds {
    /// Natural logarithm of the time value, the abscissa used by every stage.
    #[inline]
    pub fn ln(&self) -> f64 {
        self.0.ln()
    }
}

/// Thermal resistance (or thermal impedance) in K/W.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct KelvinPerWatt(pub f64);

impl KelvinPerWatt {
    /// Time constant of this resistance combined with a capacitance.
    #[inline]
    pub fn time_constant(&self, capacitance: JoulesPerKelvin) -> Seconds {
        Seconds(self.0 * capacitance.0)
    }
}

/// Thermal capacitance in J/K (Ws/K).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct JoulesPerKelvin(pub f64);

/// Power in Watts.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Watts(pub f64);

/// Temperature in degrees Celsius (differences are in Kelvin).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Celsius(pub f64);

impl Sub for Celsius {
    type Output = f64;
    fn sub(self, rhs: Self) -> f64 {
        self.0 - rhs.0
    }
}

/// Temperature rise per watt: the definition of thermal impedance.
impl Div<Watts> for f64 {
    type Output = KelvinPerWatt;
    fn div(self, rhs: Watts) -> KelvinPerWatt {
        KelvinPerWatt(self / rhs.0)
    }
}
