//! Heatmap encoder configuration format.

use crate::{common::*, HeatmapEncoderInit};

/// The CenterNet target configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::image_size")]
    pub image_w: usize,
    #[serde(default = "defaults::image_size")]
    pub image_h: usize,
    #[serde(default = "defaults::num_classes")]
    pub num_classes: usize,
    #[serde(default = "defaults::max_num_instances")]
    pub max_num_instances: usize,
    #[serde(default = "defaults::bool_true")]
    pub use_gaussian_bump: bool,
    /// Fixed Gaussian radius. The radius is derived from `gaussian_iou` if unset.
    #[serde(default)]
    pub gaussian_rad: Option<usize>,
    #[serde(default = "defaults::gaussian_iou")]
    pub gaussian_iou: f64,
    #[serde(default = "defaults::output_size")]
    pub output_w: usize,
    #[serde(default = "defaults::output_size")]
    pub output_h: usize,
    /// Spread multiplier of the center heatmap Gaussians.
    #[serde(default = "defaults::center_gaussian_scale")]
    pub center_gaussian_scale: f64,
    /// Subtracted from input classes to obtain the channel index.
    #[serde(default = "defaults::class_id_offset")]
    pub class_id_offset: i64,
    #[serde(default = "defaults::bool_false")]
    pub clamp_heatmaps: bool,
    #[serde(default = "defaults::dtype")]
    pub dtype: String,
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

    pub fn encoder_init(&self) -> HeatmapEncoderInit {
        let Self {
            image_w,
            image_h,
            num_classes,
            max_num_instances,
            use_gaussian_bump,
            gaussian_rad,
            gaussian_iou,
            output_w,
            output_h,
            center_gaussian_scale,
            class_id_offset,
            clamp_heatmaps,
            ref dtype,
        } = *self;

        HeatmapEncoderInit {
            image_w,
            image_h,
            output_w,
            output_h,
            num_classes,
            max_num_instances,
            use_gaussian_bump,
            gaussian_rad,
            gaussian_iou,
            center_gaussian_scale,
            class_id_offset,
            clamp_heatmaps,
            dtype: dtype.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_w: defaults::image_size(),
            image_h: defaults::image_size(),
            num_classes: defaults::num_classes(),
            max_num_instances: defaults::max_num_instances(),
            use_gaussian_bump: defaults::bool_true(),
            gaussian_rad: None,
            gaussian_iou: defaults::gaussian_iou(),
            output_w: defaults::output_size(),
            output_h: defaults::output_size(),
            center_gaussian_scale: defaults::center_gaussian_scale(),
            class_id_offset: defaults::class_id_offset(),
            clamp_heatmaps: defaults::bool_false(),
            dtype: defaults::dtype(),
        }
    }
}

mod defaults {
    pub fn bool_true() -> bool {
        true
    }

    pub fn bool_false() -> bool {
        false
    }

    pub fn image_size() -> usize {
        512
    }

    pub fn output_size() -> usize {
        128
    }

    pub fn num_classes() -> usize {
        90
    }

    pub fn max_num_instances() -> usize {
        128
    }

    pub fn gaussian_iou() -> f64 {
        0.7
    }

    pub fn center_gaussian_scale() -> f64 {
        5.0
    }

    pub fn class_id_offset() -> i64 {
        1
    }

    pub fn dtype() -> String {
        "float32".into()
    }
}
