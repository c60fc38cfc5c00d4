use crate::{common::*, utils::reduce, CyCxHWTensor};

/// Box regression loss `1 - metric` in the IoU family.
#[derive(Debug)]
pub struct BoxLoss {
    metric: BoxMetric,
    reduction: Reduction,
}

impl BoxLoss {
    pub fn new(metric: BoxMetric, reduction: Reduction) -> Self {
        Self { metric, reduction }
    }

    /// Returns the reduced loss and the unreduced `[num, 1]` metric scores.
    pub fn forward(&self, pred: &CyCxHWTensor, target: &CyCxHWTensor) -> (Tensor, Tensor) {
        debug_assert_eq!(
            pred.num_samples(),
            target.num_samples(),
            "pred and target must have the same number of boxes"
        );

        let score = pred.metric_with(target, self.metric);
        let loss = 1.0 - &score;
        debug_assert!(!bool::from(loss.isnan().any()), "NaN detected");

        (reduce(loss, self.reduction), score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn boxes(xcycwh: &[f32]) -> CyCxHWTensor {
        let tensor = Tensor::of_slice(xcycwh).view([-1, 4]);
        CyCxHWTensor::from_xcycwh(&tensor).unwrap()
    }

    #[test]
    fn perfect_match_has_zero_loss() {
        let target = boxes(&[0.5, 0.5, 0.2, 0.4, 0.1, 0.2, 0.1, 0.1]);
        let pred = boxes(&[0.5, 0.5, 0.2, 0.4, 0.1, 0.2, 0.1, 0.1]);
        for metric in [BoxMetric::IoU, BoxMetric::GIoU, BoxMetric::DIoU, BoxMetric::CIoU] {
            let (loss, score) = BoxLoss::new(metric, Reduction::Mean).forward(&pred, &target);
            assert_abs_diff_eq!(f64::from(&loss), 0.0, epsilon = 1e-5);
            assert_eq!(score.size(), vec![2, 1]);
        }
    }

    #[test]
    fn disjoint_boxes_are_penalized_beyond_iou() {
        let target = boxes(&[0.2, 0.2, 0.1, 0.1]);
        let pred = boxes(&[0.8, 0.8, 0.1, 0.1]);

        let (iou_loss, _) = BoxLoss::new(BoxMetric::IoU, Reduction::Sum).forward(&pred, &target);
        let (giou_loss, _) = BoxLoss::new(BoxMetric::GIoU, Reduction::Sum).forward(&pred, &target);
        let (diou_loss, _) = BoxLoss::new(BoxMetric::DIoU, Reduction::Sum).forward(&pred, &target);

        assert_abs_diff_eq!(f64::from(&iou_loss), 1.0, epsilon = 1e-6);
        assert!(f64::from(&giou_loss) > 1.0);
        assert!(f64::from(&diou_loss) > 1.0);
        assert!(f64::from(&giou_loss) <= 2.0);
    }
}
