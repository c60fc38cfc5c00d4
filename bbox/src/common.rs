pub use anyhow::{bail, ensure, Result};
pub use ndarray::{Array, Array2, ArrayBase, ArrayViewD, Axis, Data, Dimension};
pub use num_traits::{Float, FloatConst, Num, Zero};
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt::Debug,
    ops::{Mul, Neg},
};
