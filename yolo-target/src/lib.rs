//! YOLO ground truth encoding.
//!
//! Every instance is matched against the anchor priors by shape, resolved
//! to the output scales whose masks own the matched anchors, and finally
//! scattered into the per-scale grids.

mod common;

pub mod anchor;
pub use anchor::*;

pub mod assign;
pub use assign::*;

pub mod config;
pub use config::*;

pub mod encoder;
pub use encoder::*;
