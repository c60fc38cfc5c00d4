use crate::common::*;

/// Numeric precision of the encoded targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
pub enum Precision {
    #[strum(serialize = "float16")]
    #[serde(rename = "float16")]
    Float16,
    #[strum(serialize = "bfloat16")]
    #[serde(rename = "bfloat16")]
    BFloat16,
    #[strum(serialize = "float32")]
    #[serde(rename = "float32")]
    Float32,
}

impl Precision {
    /// Parse a precision selector, failing on anything other than
    /// `float16`, `bfloat16` or `float32`.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name).with_context(|| {
            format!(
                "unsupported precision '{}', expect 'float16', 'bfloat16' or 'float32'",
                name
            )
        })
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::Float32
    }
}
