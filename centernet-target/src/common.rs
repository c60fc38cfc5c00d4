pub use anyhow::{ensure, Context, Result};
pub use bbox::TLBR_;
pub use label::{InstanceSet, Precision};
pub use log::warn;
pub use ndarray::{Array1, Array2, Array3, ArrayViewMut2, Axis};
pub use rayon::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::path::Path;
