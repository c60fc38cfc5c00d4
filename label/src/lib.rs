//! Per-image object labels and the fixed-capacity instance sets fed to the encoders.

mod common;

pub mod instance;
pub use instance::*;

pub mod precision;
pub use precision::*;
