//! # lib-types
//!
//! Core data types for thermal transient analysis.
//!
//! This crate provides the plain data shared by every pipeline stage:
//! - Physical units with compile-time safety
//! - Transient curves and their logarithmic-time form
//! - Time-constant spectra
//! - Foster and Cauer RC networks

pub mod network;
pub mod spectrum;
pub mod transient;
pub mod units;

pub use network::*;
pub use spectrum::*;
pub use transient::*;
pub use units::*;
