pub use anyhow::{ensure, Result};
pub use bbox::BoxMetric;
pub use derivative::Derivative;
pub use getset::Getters;
pub use itertools::Itertools;
pub use label::Precision;
pub use log::warn;
pub use ndarray::{ArrayBase, Data, Dimension};
pub use tch::{kind::Element, Device, Kind, Reduction, Tensor};
