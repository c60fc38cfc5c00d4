//! Form conversion over arrays of boxes.
//!
//! The box arrays may have any leading shape as long as the last axis holds
//! the four box parameters.

use crate::{common::*, element::Element, TLBR_};

fn check_box_shape(shape: &[usize]) -> Result<()> {
    match shape.last() {
        Some(4) => Ok(()),
        Some(&len) => bail!("the last axis of a box array must be 4, but get {}", len),
        None => bail!("box array must have at least one dimension"),
    }
}

/// Convert `(y_min, x_min, y_max, x_max)` boxes to `(x_center, y_center, width, height)`.
pub fn yxyx_to_xcycwh<S, T, D>(boxes: &ArrayBase<S, D>) -> Result<Array<T, D>>
where
    S: Data<Elem = T>,
    T: Element,
    D: Dimension,
{
    check_box_shape(boxes.shape())?;
    let two = T::one() + T::one();
    let mut output = boxes.to_owned();
    let last = Axis(output.ndim() - 1);

    output.lanes_mut(last).into_iter().for_each(|mut lane| {
        let [t, l, b, r] = [lane[0], lane[1], lane[2], lane[3]];
        lane[0] = (l + r) / two;
        lane[1] = (t + b) / two;
        lane[2] = r - l;
        lane[3] = b - t;
    });

    Ok(output)
}

/// Convert `(x_center, y_center, width, height)` boxes to `(y_min, x_min, y_max, x_max)`.
pub fn xcycwh_to_yxyx<S, T, D>(boxes: &ArrayBase<S, D>) -> Result<Array<T, D>>
where
    S: Data<Elem = T>,
    T: Element,
    D: Dimension,
{
    check_box_shape(boxes.shape())?;
    let two = T::one() + T::one();
    let mut output = boxes.to_owned();
    let last = Axis(output.ndim() - 1);

    output.lanes_mut(last).into_iter().for_each(|mut lane| {
        let [cx, cy, w, h] = [lane[0], lane[1], lane[2], lane[3]];
        lane[0] = cy - h / two;
        lane[1] = cx - w / two;
        lane[2] = cy + h / two;
        lane[3] = cx + w / two;
    });

    Ok(output)
}

/// Read a `[num_boxes, 4]` array of corner-form boxes without validating them.
pub fn unchecked_tlbr_from_array<T>(boxes: ArrayViewD<'_, T>) -> Result<Vec<TLBR_<T>>>
where
    T: Copy,
{
    ensure!(
        boxes.ndim() == 2,
        "expect a box array of rank 2, but get rank {}",
        boxes.ndim()
    );
    check_box_shape(boxes.shape())?;

    let boxes = boxes
        .outer_iter()
        .map(|row| TLBR_ {
            t: row[0],
            l: row[1],
            b: row[2],
            r: row[3],
        })
        .collect();
    Ok(boxes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array3};

    #[test]
    fn form_conversion_is_shape_preserving() -> Result<()> {
        let boxes: Array3<f64> = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| {
            let base = (i * 3 + j) as f64 * 0.1;
            match k {
                0 | 1 => base,
                _ => base + 0.05 * (k as f64),
            }
        });

        let center = yxyx_to_xcycwh(&boxes)?;
        assert_eq!(center.shape(), boxes.shape());

        let back = xcycwh_to_yxyx(&center)?;
        back.iter()
            .zip(boxes.iter())
            .for_each(|(&lhs, &rhs)| assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12));
        Ok(())
    }

    #[test]
    fn center_form_values() -> Result<()> {
        let boxes = array![[0.1, 0.2, 0.5, 0.4]];
        let center = yxyx_to_xcycwh(&boxes)?;
        let expect = [0.3, 0.3, 0.2, 0.4];
        center
            .iter()
            .zip(expect.iter())
            .for_each(|(&lhs, &rhs)| assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12));
        Ok(())
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        let boxes = array![[0.0, 0.0, 1.0], [0.0, 0.0, 1.0]];
        assert!(yxyx_to_xcycwh(&boxes).is_err());
        assert!(xcycwh_to_yxyx(&boxes).is_err());

        let flat = array![0.0, 0.0, 1.0, 1.0];
        assert!(unchecked_tlbr_from_array(flat.view().into_dyn()).is_err());
    }

    #[test]
    fn inverted_boxes_are_kept_raw() -> Result<()> {
        let boxes = array![[200.0, 100.0, 15.0, 170.0]];
        let raw = unchecked_tlbr_from_array(boxes.view().into_dyn())?;
        assert_eq!(raw.len(), 1);
        assert_abs_diff_eq!(raw[0].h(), -185.0);
        assert_abs_diff_eq!(raw[0].cy(), 107.5);
        Ok(())
    }
}
