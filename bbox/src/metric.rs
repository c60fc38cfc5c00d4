//! Overlap metrics in the IoU family.

use crate::{
    common::*,
    element::Element,
    rect::{RectFloat, RectNum},
    Rect,
};

/// The overlap metric used to compare two boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxMetric {
    IoU,
    GIoU,
    DIoU,
    CIoU,
}

/// Division that yields zero instead of NaN or infinity when `den` is zero.
pub fn divide_no_nan<T>(num: T, den: T) -> T
where
    T: Float,
{
    if den == T::zero() {
        T::zero()
    } else {
        num / den
    }
}

fn clamp_unit<T>(value: T) -> T
where
    T: Float,
{
    value.max(-T::one()).min(T::one())
}

/// Intersection over union. Two boxes with zero union have zero IoU.
pub fn iou<A, B, T>(lhs: &A, rhs: &B) -> T
where
    A: Rect<Type = T>,
    B: Rect<Type = T>,
    T: Element,
{
    let inter = lhs.intersection_area_with(rhs);
    let union = lhs.area() + rhs.area() - inter;
    divide_no_nan(inter, union)
}

/// Generalized IoU. Returns `(iou, giou)`.
pub fn giou<A, B, T>(lhs: &A, rhs: &B) -> (T, T)
where
    A: Rect<Type = T>,
    B: Rect<Type = T>,
    T: Element,
{
    let inter = lhs.intersection_area_with(rhs);
    let union = lhs.area() + rhs.area() - inter;
    let iou = divide_no_nan(inter, union);

    let closure = lhs.closure_with(rhs).area();
    let giou = iou - divide_no_nan(closure - union, closure);
    (iou, clamp_unit(giou))
}

/// Distance IoU. Returns `(iou, diou)`.
pub fn diou<A, B, T>(lhs: &A, rhs: &B) -> (T, T)
where
    A: Rect<Type = T>,
    B: Rect<Type = T>,
    T: Element,
{
    let iou = iou(lhs, rhs);
    let center_dist = lhs.center_distance_square_to(rhs);
    let diagonal = lhs.closure_with(rhs).diagonal_square();
    let diou = iou - divide_no_nan(center_dist, diagonal);
    (iou, clamp_unit(diou))
}

/// Complete IoU. Returns `(iou, ciou)`.
pub fn ciou<A, B, T>(lhs: &A, rhs: &B) -> (T, T)
where
    A: Rect<Type = T>,
    B: Rect<Type = T>,
    T: Element,
{
    let (iou, diou) = diou(lhs, rhs);
    let v = aspect_consistency(lhs, rhs);
    let alpha = divide_no_nan(v, (T::one() - iou) + v);
    (iou, clamp_unit(diou - alpha * v))
}

/// The aspect ratio term `4/π² (atan(w1/h1) - atan(w2/h2))²`. The angles are
/// taken with `atan2`, so a zero-height box has angle π/2.
pub fn aspect_consistency<A, B, T>(lhs: &A, rhs: &B) -> T
where
    A: Rect<Type = T>,
    B: Rect<Type = T>,
    T: Element,
{
    let pi = T::PI();
    let two = T::one() + T::one();
    let four = two * two;
    let lhs_angle = lhs.w().atan2(lhs.h());
    let rhs_angle = rhs.w().atan2(rhs.h());
    four / (pi * pi) * (lhs_angle - rhs_angle).powi(2)
}

/// Compute a single overlap value. For the extended metrics this is the
/// clamped metric rather than the plain IoU.
pub fn overlap<A, B, T>(lhs: &A, rhs: &B, metric: BoxMetric) -> T
where
    A: Rect<Type = T>,
    B: Rect<Type = T>,
    T: Element,
{
    match metric {
        BoxMetric::IoU => iou(lhs, rhs),
        BoxMetric::GIoU => giou(lhs, rhs).1,
        BoxMetric::DIoU => diou(lhs, rhs).1,
        BoxMetric::CIoU => ciou(lhs, rhs).1,
    }
}

/// All-pairs overlap, indexed `[a_index, b_index]`.
pub fn pairwise_iou_matrix<A, B, T>(set_a: &[A], set_b: &[B], metric: BoxMetric) -> Array2<T>
where
    A: Rect<Type = T>,
    B: Rect<Type = T>,
    T: Element,
{
    Array2::from_shape_fn((set_a.len(), set_b.len()), |(i, j)| {
        overlap(&set_a[i], &set_b[j], metric)
    })
}
