use crate::common::*;

pub const EPSILON: f64 = 1e-16;

/// Apply a reduction. The mean of an empty tensor is zero.
pub fn reduce(loss: Tensor, reduction: Reduction) -> Tensor {
    match reduction {
        Reduction::None => loss,
        Reduction::Sum => loss.sum(Kind::Float),
        Reduction::Mean => {
            if loss.numel() == 0 {
                Tensor::zeros(&[], (Kind::Float, loss.device())).set_requires_grad(false)
            } else {
                loss.mean(Kind::Float)
            }
        }
        Reduction::Other(_) => unimplemented!(),
    }
}
