use crate::{
    common::*, CenterNetTargetTensors, L1Loss, PenaltyReducedFocalLoss,
    PenaltyReducedFocalLossInit,
};

/// Weights of the CenterNet loss terms.
///
/// The total loss is the weighted sum of the heatmap, size and offset terms.
/// Setting `size_weight` and `offset_weight` to 0 trains on the heatmap term
/// alone, with size and offset still reported in the output.
#[derive(Debug, Clone)]
pub struct CenterNetLossInit {
    pub ct_heatmap_weight: f64,
    pub size_weight: f64,
    pub offset_weight: f64,
}

impl Default for CenterNetLossInit {
    fn default() -> Self {
        Self {
            ct_heatmap_weight: 1.0,
            size_weight: 0.1,
            offset_weight: 1.0,
        }
    }
}

impl CenterNetLossInit {
    pub fn build(self) -> Result<CenterNetLoss> {
        let Self {
            ct_heatmap_weight,
            size_weight,
            offset_weight,
        } = self;

        ensure!(
            ct_heatmap_weight >= 0.0 && size_weight >= 0.0 && offset_weight >= 0.0,
            "loss weights must be non-negative"
        );

        Ok(CenterNetLoss {
            focal_loss: PenaltyReducedFocalLossInit::default(Reduction::None).build()?,
            l1_loss: L1Loss::new(Reduction::None),
            ct_heatmap_weight,
            size_weight,
            offset_weight,
        })
    }
}

/// Center heatmap, size and offset losses of CenterNet.
#[derive(Debug)]
pub struct CenterNetLoss {
    focal_loss: PenaltyReducedFocalLoss,
    l1_loss: L1Loss,
    ct_heatmap_weight: f64,
    size_weight: f64,
    offset_weight: f64,
}

/// Model outputs in channel-last layout.
#[derive(Debug)]
pub struct CenterNetPrediction {
    /// `[batch, height, width, num_classes]` logits
    pub ct_heatmaps: Tensor,
    /// `[batch, height, width, 2]`
    pub ct_size: Tensor,
    /// `[batch, height, width, 2]`
    pub ct_offset: Tensor,
}

#[derive(Debug)]
pub struct CenterNetLossOutput {
    pub total_loss: Tensor,
    pub ct_loss: Tensor,
    pub size_loss: Tensor,
    pub offset_loss: Tensor,
}

impl CenterNetLoss {
    /// Every term is summed and normalized by `batch * num_boxes`, where
    /// `num_boxes` counts the real instances in the batch, at least 1.
    pub fn forward(
        &self,
        pred: &CenterNetPrediction,
        target: &CenterNetTargetTensors,
    ) -> Result<CenterNetLossOutput> {
        let (batch_size, height, width, _) = pred.ct_heatmaps.size4()?;
        ensure!(
            pred.ct_heatmaps.size() == target.ct_heatmaps.size(),
            "expect ct_heatmaps in shape {:?}, but get {:?}",
            target.ct_heatmaps.size(),
            pred.ct_heatmaps.size()
        );
        ensure!(
            pred.ct_size.size() == vec![batch_size, height, width, 2]
                && pred.ct_offset.size() == vec![batch_size, height, width, 2],
            "ct_size and ct_offset must be in shape [{}, {}, {}, 2]",
            batch_size,
            height,
            width
        );

        let target_heatmaps = target.ct_heatmaps.to_kind(Kind::Float);
        let mask = target.box_mask.to_kind(Kind::Float);
        let num_boxes = mask.sum(Kind::Float).clamp_min(1.0);
        let norm = num_boxes * batch_size as f64;

        let ct_loss = self
            .focal_loss
            .forward(&pred.ct_heatmaps, &target_heatmaps)
            .sum(Kind::Float)
            / &norm;

        // gather predictions at the recorded center cells
        let weight = mask.unsqueeze(-1);
        let size_pred = Self::gather_cells(&pred.ct_size, &target.box_indices, width)?;
        let offset_pred = Self::gather_cells(&pred.ct_offset, &target.box_indices, width)?;

        let size_loss = self
            .l1_loss
            .forward(&size_pred, &target.size.to_kind(Kind::Float), Some(&weight))
            .sum(Kind::Float)
            / &norm;
        let offset_loss = self
            .l1_loss
            .forward(&offset_pred, &target.ct_offset.to_kind(Kind::Float), Some(&weight))
            .sum(Kind::Float)
            / &norm;

        let total_loss = self.ct_heatmap_weight * &ct_loss
            + self.size_weight * &size_loss
            + self.offset_weight * &offset_loss;

        Ok(CenterNetLossOutput {
            total_loss,
            ct_loss,
            size_loss,
            offset_loss,
        })
    }

    /// Pick `[batch, max_num_instances, channels]` entries out of a
    /// `[batch, height, width, channels]` map at `(row, col)` indices.
    fn gather_cells(map: &Tensor, indices: &Tensor, width: i64) -> Result<Tensor> {
        let (batch_size, _, _, channels) = map.size4()?;
        let (_, num_instances, _) = indices.size3()?;

        let flat_map = map.view([batch_size, -1, channels]);
        let rows = indices.narrow(2, 0, 1);
        let cols = indices.narrow(2, 1, 1);
        let flat_indices = (rows * width + cols)
            .to_kind(Kind::Int64)
            .expand(&[batch_size, num_instances, channels], false);
        Ok(flat_map.gather(1, &flat_indices, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn target() -> CenterNetTargetTensors {
        let device = Device::Cpu;
        let heatmaps = Tensor::zeros(&[1, 4, 4, 1], (Kind::Float, device));
        let _ = heatmaps.narrow(1, 1, 1).narrow(2, 2, 1).fill_(1.0);

        CenterNetTargetTensors {
            tl_heatmaps: heatmaps.zeros_like(),
            br_heatmaps: heatmaps.zeros_like(),
            ct_heatmaps: heatmaps,
            tl_offset: Tensor::zeros(&[1, 2, 2], (Kind::Float, device)),
            br_offset: Tensor::zeros(&[1, 2, 2], (Kind::Float, device)),
            ct_offset: Tensor::of_slice(&[0.5f32, 0.25, 0.0, 0.0]).view([1, 2, 2]),
            size: Tensor::of_slice(&[2f32, 3.0, 0.0, 0.0]).view([1, 2, 2]),
            box_mask: Tensor::of_slice(&[1i64, 0]).view([1, 2]),
            box_indices: Tensor::of_slice(&[1i64, 2, 0, 0]).view([1, 2, 2]),
        }
    }

    #[test]
    fn size_and_offset_are_gathered_at_centers() -> Result<()> {
        let target = target();
        let ct_size = Tensor::zeros(&[1, 4, 4, 2], (Kind::Float, Device::Cpu));
        let _ = ct_size.narrow(1, 1, 1).narrow(2, 2, 1).copy_(&Tensor::of_slice(&[2f32, 4.0]).view([1, 1, 1, 2]));

        let pred = CenterNetPrediction {
            ct_heatmaps: Tensor::zeros(&[1, 4, 4, 1], (Kind::Float, Device::Cpu)),
            ct_size,
            ct_offset: Tensor::zeros(&[1, 4, 4, 2], (Kind::Float, Device::Cpu)),
        };
        let output = CenterNetLossInit::default().build()?.forward(&pred, &target)?;

        // the masked second slot does not contribute
        assert_abs_diff_eq!(f64::from(&output.size_loss), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(f64::from(&output.offset_loss), 0.75, epsilon = 1e-6);

        // one positive and 15 zero-target negatives at p = 0.5
        let ln_half = 0.5f64.ln();
        let expected_ct = -0.25 * ln_half * 16.0;
        assert_abs_diff_eq!(f64::from(&output.ct_loss), expected_ct, epsilon = 1e-5);
        assert_abs_diff_eq!(
            f64::from(&output.total_loss),
            expected_ct + 0.1 + 0.75,
            epsilon = 1e-5
        );
        Ok(())
    }

    #[test]
    fn zero_weights_leave_the_heatmap_term() -> Result<()> {
        let target = target();
        let pred = CenterNetPrediction {
            ct_heatmaps: Tensor::zeros(&[1, 4, 4, 1], (Kind::Float, Device::Cpu)),
            ct_size: Tensor::ones(&[1, 4, 4, 2], (Kind::Float, Device::Cpu)),
            ct_offset: Tensor::ones(&[1, 4, 4, 2], (Kind::Float, Device::Cpu)),
        };
        let output = CenterNetLossInit {
            size_weight: 0.0,
            offset_weight: 0.0,
            ..Default::default()
        }
        .build()?
        .forward(&pred, &target)?;

        assert_abs_diff_eq!(
            f64::from(&output.total_loss),
            f64::from(&output.ct_loss),
            epsilon = 1e-6
        );
        assert!(f64::from(&output.size_loss) > 0.0);
        assert!(f64::from(&output.offset_loss) > 0.0);
        Ok(())
    }

    #[test]
    fn shape_mismatch_is_an_error() -> Result<()> {
        let pred = CenterNetPrediction {
            ct_heatmaps: Tensor::zeros(&[1, 4, 4, 2], (Kind::Float, Device::Cpu)),
            ct_size: Tensor::zeros(&[1, 4, 4, 2], (Kind::Float, Device::Cpu)),
            ct_offset: Tensor::zeros(&[1, 4, 4, 2], (Kind::Float, Device::Cpu)),
        };
        assert!(CenterNetLossInit::default()
            .build()?
            .forward(&pred, &target())
            .is_err());
        Ok(())
    }
}
