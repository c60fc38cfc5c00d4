//! CenterNet ground truth encoding.
//!
//! Instances are turned into corner and center heatmaps with Gaussian
//! peaks, plus per-instance offset, size and index targets.

mod common;

pub mod config;
pub use config::*;

pub mod encoder;
pub use encoder::*;

pub mod gaussian;
pub use gaussian::*;
