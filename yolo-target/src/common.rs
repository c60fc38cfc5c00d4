pub use anyhow::{bail, ensure, Context, Result};
pub use bbox::{BoxMetric, CyCxHW, HW, TLBR_};
pub use indexmap::IndexMap;
pub use itertools::Itertools;
pub use label::{InstanceSet, Precision};
pub use log::{debug, warn};
pub use ndarray::{Array2, Array4};
pub use rayon::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{cmp::Ordering, path::Path};
