pub use anyhow::{ensure, Context, Result};
pub use bbox::{Transform, HW, TLBR_};
pub use log::warn;
pub use ndarray::{Array2, ArrayViewD};
pub use num_traits::Float;
pub use serde::{Deserialize, Serialize};
pub use std::str::FromStr;
pub use strum::{AsRefStr, Display, EnumString};
