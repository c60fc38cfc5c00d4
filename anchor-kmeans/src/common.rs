pub use anyhow::{bail, ensure, Context, Result};
pub use bbox::{BoxMetric, HW};
pub use itertools::Itertools;
pub use log::{debug, info, warn};
pub use rand::prelude::*;
pub use rayon::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    io::Read,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};
pub use strum::{AsRefStr, Display, EnumString};
