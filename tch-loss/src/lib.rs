//! Training losses over encoded targets, computed with libtorch.

mod common;

pub mod box_loss;
pub use box_loss::*;

pub mod box_tensor;
pub use box_tensor::*;

pub mod centernet_loss;
pub use centernet_loss::*;

pub mod convert;
pub use convert::*;

pub mod focal_loss;
pub use focal_loss::*;

pub mod l1_loss;
pub use l1_loss::*;

mod utils;
