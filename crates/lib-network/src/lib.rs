//! # lib-network
//!
//! RC network synthesis for thermal structure functions.
//!
//! - **Foster**: one parallel RC pair per time-constant spectrum sample
//! - **Cauer**: Foster → ladder in arbitrary precision, five algorithms
//! - **Structure functions**: cumulative and differential capacitance over resistance
//! - **Synthetic**: ladder → Foster by eigendecomposition, test transients
//! - **Theoretical**: exact spectra of distributed RC lines
//! - **Prediction**: temperature response to a power profile

pub mod error;
pub mod precision;
pub mod polynomial;
pub mod foster;
pub mod cauer;
pub mod structure;
pub mod synthetic;
pub mod theoretical;
pub mod prediction;

pub use error::{NetworkError, NetworkResult};
pub use precision::{Precision, Real, DEFAULT_PRECISION_BITS, MIN_PRECISION_BITS};
pub use foster::{build_foster, merge_coincident_poles, FosterBuild, FosterConfig};
pub use cauer::{
    synthesize, CauerConfig, CauerMethod, CauerSynthesis, DEFAULT_BLOCKWISE_SUM_WIDTH, RESISTANCE_DRIFT_TOLERANCE,
};
pub use structure::{StructureFunction, StructureRow, DEFAULT_DISPLAY_CAPACITANCE_LIMIT};
pub use synthetic::{cauer_to_foster, discrete_spectrum, synthetic_transient, SyntheticTransient};
pub use theoretical::{DistributedLadder, LineProfile, DEFAULT_LINE_DELTA_DEGREES};
pub use prediction::{predict_temperature, TemperaturePrediction};
