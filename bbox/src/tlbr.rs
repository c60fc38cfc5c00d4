use super::{CyCxHW, Rect};
use crate::{common::*, Transform};

/// Bounding box in TLBR format, i.e. `(y_min, x_min, y_max, x_max)`.
///
/// Zero-area boxes are valid. Inverted boxes are rejected on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + Num,
{
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        TLBR {
            t: self.t * transform.sy + transform.ty,
            l: self.l * transform.sx + transform.tx,
            b: self.b * transform.sy + transform.ty,
            r: self.r * transform.sx + transform.tx,
        }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn cy(&self) -> Self::Type {
        let two = T::one() + T::one();
        (self.t + self.b) / two
    }

    fn cx(&self) -> Self::Type {
        let two = T::one() + T::one();
        (self.l + self.r) / two
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");
        Ok(Self { t, l, b, r })
    }

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self> {
        let [t, l, h, w] = tlhw;
        Self::try_from_tlbr([t, l, t + h, l + w])
    }

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self> {
        let [cy, cx, h, w] = cycxhw;
        let zero = T::zero();
        ensure!(h >= zero && w >= zero, "h and w must be non-negative");

        let two = T::one() + T::one();
        Ok(Self {
            t: cy - h / two,
            l: cx - w / two,
            b: cy + h / two,
            r: cx + w / two,
        })
    }
}

impl<T> From<&CyCxHW<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: &CyCxHW<T>) -> Self {
        let two = T::one() + T::one();
        let CyCxHW { cy, cx, h, w } = *from;
        Self {
            t: cy - h / two,
            l: cx - w / two,
            b: cy + h / two,
            r: cx + w / two,
        }
    }
}

impl<T> From<CyCxHW<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: CyCxHW<T>) -> Self {
        Self::from(&from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tlbr_rejects_inverted_box() {
        assert!(TLBR::try_from_tlbr([2.0, 0.0, 1.0, 1.0]).is_err());
        assert!(TLBR::try_from_tlbr([1.0, 0.0, 1.0, 1.0]).is_ok());
    }

    #[test]
    fn tlbr_center_form_round_trip() {
        let tlbr = TLBR::from_tlbr([0.1, 0.2, 0.7, 0.5]);
        let [cx, cy, w, h] = tlbr.xcycwh();
        assert_abs_diff_eq!(cx, 0.35, epsilon = 1e-12);
        assert_abs_diff_eq!(cy, 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(w, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(h, 0.6, epsilon = 1e-12);

        let back = TLBR::from(tlbr.to_cycxhw());
        tlbr.tlbr()
            .iter()
            .zip(back.tlbr().iter())
            .for_each(|(&lhs, &rhs)| assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12));
    }
}
