//! Anchor prior discovery by k-means clustering over box sizes.
//!
//! The distance between a box size and a centroid is `1 - IoU`, both placed
//! at the origin, so that large and small boxes are weighed alike.

mod common;

pub mod dataset;
pub use dataset::*;

pub mod kmeans;
pub use kmeans::*;

pub mod minibatch;
pub use minibatch::*;
