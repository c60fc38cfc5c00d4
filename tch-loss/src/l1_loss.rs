use crate::{common::*, utils::reduce};

/// L1 localization loss with optional per-element weights.
#[derive(Debug)]
pub struct L1Loss {
    reduction: Reduction,
}

impl L1Loss {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }

    /// `weight` must broadcast to the input shape.
    pub fn forward(&self, input: &Tensor, target: &Tensor, weight: Option<&Tensor>) -> Tensor {
        debug_assert_eq!(
            input.size(),
            target.size(),
            "input and target shape must be equal"
        );

        let loss = (input - target).abs();
        let loss = match weight {
            Some(weight) => loss * weight,
            None => loss,
        };
        reduce(loss, self.reduction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weighted_l1() {
        let input = Tensor::of_slice(&[1f32, 2.0, 3.0, 4.0]).view([2, 2]);
        let target = Tensor::of_slice(&[0f32, 2.5, 3.0, 0.0]).view([2, 2]);
        let weight = Tensor::of_slice(&[1f32, 0.0]).view([2, 1]);

        let sum = L1Loss::new(Reduction::Sum).forward(&input, &target, None);
        assert_abs_diff_eq!(f64::from(&sum), 5.5);

        let masked = L1Loss::new(Reduction::Sum).forward(&input, &target, Some(&weight));
        assert_abs_diff_eq!(f64::from(&masked), 1.5);

        let mean = L1Loss::new(Reduction::Mean).forward(&input, &target, None);
        assert_abs_diff_eq!(f64::from(&mean), 1.375);
    }

    #[test]
    fn empty_mean_is_zero() {
        let empty = Tensor::zeros(&[0, 2], (Kind::Float, Device::Cpu));
        let loss = L1Loss::new(Reduction::Mean).forward(&empty, &empty, None);
        assert_abs_diff_eq!(f64::from(&loss), 0.0);
    }
}
