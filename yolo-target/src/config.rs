//! Grid encoder configuration format.

use crate::{common::*, YoloTargetEncoderInit};

/// The YOLO target configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::image_size")]
    pub image_w: usize,
    #[serde(default = "defaults::image_size")]
    pub image_h: usize,
    #[serde(default = "defaults::num_classes")]
    pub num_classes: usize,
    /// Input class ids start from this value.
    #[serde(default = "defaults::class_id_offset")]
    pub class_id_offset: i64,
    #[serde(default = "defaults::max_num_instances")]
    pub max_num_instances: usize,
    /// Anchor priors in pixels, in `(width, height)` order.
    #[serde(default = "defaults::anchors")]
    pub anchors: Vec<[f64; 2]>,
    #[serde(default = "defaults::scales")]
    pub scales: Vec<ScaleConfig>,
    #[serde(default = "defaults::iou_thresh")]
    pub iou_thresh: f64,
    #[serde(default = "defaults::bool_true")]
    pub use_tie_breaker: bool,
    #[serde(default = "defaults::dtype")]
    pub dtype: String,
}

/// An output scale. The grid stride of the scale is `2^level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub level: usize,
    pub mask: Vec<usize>,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    pub fn encoder_init(&self) -> YoloTargetEncoderInit {
        YoloTargetEncoderInit {
            image_w: self.image_w,
            image_h: self.image_h,
            num_classes: self.num_classes,
            class_id_offset: self.class_id_offset,
            max_num_instances: self.max_num_instances,
            anchors: self.anchors.clone(),
            scales: self.scales.clone(),
            iou_thresh: self.iou_thresh,
            use_tie_breaker: self.use_tie_breaker,
            dtype: self.dtype.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_w: defaults::image_size(),
            image_h: defaults::image_size(),
            num_classes: defaults::num_classes(),
            class_id_offset: defaults::class_id_offset(),
            max_num_instances: defaults::max_num_instances(),
            anchors: defaults::anchors(),
            scales: defaults::scales(),
            iou_thresh: defaults::iou_thresh(),
            use_tie_breaker: defaults::bool_true(),
            dtype: defaults::dtype(),
        }
    }
}

mod defaults {
    use super::*;

    pub fn bool_true() -> bool {
        true
    }

    pub fn image_size() -> usize {
        416
    }

    pub fn num_classes() -> usize {
        80
    }

    pub fn class_id_offset() -> i64 {
        1
    }

    pub fn max_num_instances() -> usize {
        200
    }

    pub fn anchors() -> Vec<[f64; 2]> {
        vec![
            [12.0, 16.0],
            [19.0, 36.0],
            [40.0, 28.0],
            [36.0, 75.0],
            [76.0, 55.0],
            [72.0, 146.0],
            [142.0, 110.0],
            [192.0, 243.0],
            [459.0, 401.0],
        ]
    }

    pub fn scales() -> Vec<ScaleConfig> {
        vec![
            ScaleConfig {
                level: 3,
                mask: vec![0, 1, 2],
            },
            ScaleConfig {
                level: 4,
                mask: vec![3, 4, 5],
            },
            ScaleConfig {
                level: 5,
                mask: vec![6, 7, 8],
            },
        ]
    }

    pub fn iou_thresh() -> f64 {
        0.2
    }

    pub fn dtype() -> String {
        "float32".into()
    }
}
