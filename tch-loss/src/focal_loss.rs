use crate::{common::*, utils::reduce};

/// Penalty-reduced focal loss initializer.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PenaltyReducedFocalLossInit {
    /// The focusing exponent on the prediction.
    pub alpha: f64,
    /// The exponent reducing the penalty near heatmap peaks.
    pub beta: f64,
    /// Probabilities are clipped into `[clip, 1 - clip]`.
    pub sigmoid_clip: f64,
    /// The reduction method applied on output loss.
    pub reduction: Reduction,
}

impl PenaltyReducedFocalLossInit {
    pub fn default(reduction: Reduction) -> Self {
        Self {
            alpha: 2.0,
            beta: 4.0,
            sigmoid_clip: 1e-4,
            reduction,
        }
    }

    pub fn build(self) -> Result<PenaltyReducedFocalLoss> {
        let Self {
            alpha,
            beta,
            sigmoid_clip,
            reduction,
        } = self;

        ensure!(alpha >= 0.0, "alpha must be non-negative, but get {}", alpha);
        ensure!(beta >= 0.0, "beta must be non-negative, but get {}", beta);
        ensure!(
            sigmoid_clip > 0.0 && sigmoid_clip < 0.5,
            "sigmoid_clip must be in range (0, 0.5), but get {}",
            sigmoid_clip
        );

        Ok(PenaltyReducedFocalLoss {
            alpha,
            beta,
            sigmoid_clip,
            reduction,
        })
    }
}

/// Focal loss over Gaussian heatmap targets.
///
/// Targets are clamped into `[0, 1]`, so overlapping peaks accumulated above 1
/// still count. Pixels whose clamped target is 1 are positives. Every other
/// pixel is a negative whose penalty is scaled by `(1 - target)^beta`.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PenaltyReducedFocalLoss {
    alpha: f64,
    beta: f64,
    sigmoid_clip: f64,
    reduction: Reduction,
}

impl PenaltyReducedFocalLoss {
    /// Compute the loss from logits against a heatmap of equal shape.
    pub fn forward(&self, logits: &Tensor, target: &Tensor) -> Tensor {
        debug_assert_eq!(
            logits.size(),
            target.size(),
            "input and target shape must be equal"
        );

        let Self {
            alpha,
            beta,
            sigmoid_clip,
            reduction,
        } = *self;

        let prob = logits.sigmoid().clamp(sigmoid_clip, 1.0 - sigmoid_clip);
        let target = target.clamp(0.0, 1.0);
        let pos_mask = target.ge(1.0).to_kind(Kind::Float);

        let pos_loss = (1.0 - &prob).pow(alpha) * prob.log();
        let neg_loss = (1.0 - &target).pow(beta) * prob.pow(alpha) * (1.0 - &prob).log();
        let loss = -(&pos_mask * pos_loss + (1.0 - &pos_mask) * neg_loss);

        reduce(loss, reduction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn pixel_losses() -> Result<()> {
        let loss_fn = PenaltyReducedFocalLossInit::default(Reduction::None).build()?;
        let logits = Tensor::of_slice(&[0f32, 0.0, 0.0, 20.0]);
        let target = Tensor::of_slice(&[1f32, 0.5, 0.0, 0.0]);
        let loss = Vec::<f32>::from(&loss_fn.forward(&logits, &target));

        let ln_half = 0.5f64.ln();
        assert_abs_diff_eq!(loss[0] as f64, -0.25 * ln_half, epsilon = 1e-6);
        assert_abs_diff_eq!(loss[1] as f64, -0.0625 * 0.25 * ln_half, epsilon = 1e-6);
        assert_abs_diff_eq!(loss[2] as f64, -0.25 * ln_half, epsilon = 1e-6);

        // saturated logits are clipped, the loss stays finite
        let clipped = 1.0 - 1e-4f64;
        assert_abs_diff_eq!(
            loss[3] as f64,
            -clipped.powi(2) * (1e-4f64).ln(),
            epsilon = 1e-3
        );
        Ok(())
    }

    #[test]
    fn accumulated_peaks_are_positives() -> Result<()> {
        let loss_fn = PenaltyReducedFocalLossInit::default(Reduction::None).build()?;
        let logits = Tensor::of_slice(&[0f32, 0.0, 0.0]);
        let peaks = Tensor::of_slice(&[1.98f32, 1.0, 1.2]);
        let loss = Vec::<f32>::from(&loss_fn.forward(&logits, &peaks));

        let expected = -0.25 * 0.5f64.ln();
        for value in loss {
            assert_abs_diff_eq!(value as f64, expected, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn confident_predictions_have_small_loss() -> Result<()> {
        let loss_fn = PenaltyReducedFocalLossInit::default(Reduction::Sum).build()?;
        let target = Tensor::of_slice(&[1f32, 0.0, 0.0, 0.8]);
        let good = Tensor::of_slice(&[8f32, -8.0, -8.0, -8.0]);
        let bad = Tensor::of_slice(&[-8f32, 8.0, 8.0, 8.0]);

        let good_loss = f64::from(&loss_fn.forward(&good, &target));
        let bad_loss = f64::from(&loss_fn.forward(&bad, &target));
        assert!(good_loss < 1e-3);
        assert!(bad_loss > 1.0);
        Ok(())
    }

    #[test]
    fn invalid_parameters() {
        let init = |sigmoid_clip| PenaltyReducedFocalLossInit {
            sigmoid_clip,
            ..PenaltyReducedFocalLossInit::default(Reduction::Mean)
        };
        assert!(init(0.0).build().is_err());
        assert!(init(0.6).build().is_err());
        assert!(PenaltyReducedFocalLossInit {
            alpha: -1.0,
            ..PenaltyReducedFocalLossInit::default(Reduction::Mean)
        }
        .build()
        .is_err());
    }
}
