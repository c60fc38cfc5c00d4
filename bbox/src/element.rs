use crate::common::*;

/// Scalar type usable in box geometry and overlap metrics.
pub trait Element: Float + FloatConst + Debug {}

impl<T> Element for T where T: Float + FloatConst + Debug {}
