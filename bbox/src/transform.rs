use super::{CyCxHW, Rect, TLBR};
use crate::{common::*, HW};

/// Axis-aligned affine map `y' = y * sy + ty`, `x' = x * sx + tx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    /// The transform mapping `src` onto `tgt`.
    pub fn try_from_rects<R>(src: &R, tgt: &R) -> Result<Self>
    where
        R: Rect<Type = T>,
    {
        let zero = T::zero();
        ensure!(
            src.h() > zero && src.w() > zero,
            "the source rectangle must have positive size"
        );

        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.t() - src.t() * sy;
        let tx = tgt.l() - src.l() * sx;

        Ok(Self { sy, sx, ty, tx })
    }

    /// Stretch a canvas of `src_size` to fill `tgt_size`.
    pub fn try_from_sizes_exact(src_size: &HW<T>, tgt_size: &HW<T>) -> Result<Self> {
        let src = TLBR::try_from_tlhw([T::zero(), T::zero(), src_size.h(), src_size.w()])?;
        let tgt = TLBR::try_from_tlhw([T::zero(), T::zero(), tgt_size.h(), tgt_size.w()])?;
        Self::try_from_rects(&src, &tgt)
    }

    /// Fit a canvas of `src_size` into `tgt_size`, preserving its aspect ratio
    /// and centering it on the longer side.
    pub fn try_from_sizes_letterbox(src_size: &HW<T>, tgt_size: &HW<T>) -> Result<Self> {
        let zero = T::zero();
        ensure!(
            src_size.h() > zero && src_size.w() > zero,
            "the source size must be positive"
        );

        let (new_h, new_w) = if tgt_size.h() * src_size.w() <= tgt_size.w() * src_size.h() {
            (tgt_size.h(), src_size.w() * tgt_size.h() / src_size.h())
        } else {
            (src_size.h() * tgt_size.w() / src_size.w(), tgt_size.w())
        };

        let two = T::one() + T::one();
        let off_y = (tgt_size.h() - new_h) / two;
        let off_x = (tgt_size.w() - new_w) / two;

        let src = TLBR::try_from_tlhw([T::zero(), T::zero(), src_size.h(), src_size.w()])?;
        let tgt = TLBR::try_from_tlhw([off_y, off_x, new_h, new_w])?;

        Self::try_from_rects(&src, &tgt)
    }
}

impl<T> Transform<T>
where
    T: Copy + Num + Neg<Output = T>,
{
    pub fn inverse(&self) -> Self {
        Self {
            sy: T::one() / self.sy,
            sx: T::one() / self.sx,
            ty: -self.ty / self.sy,
            tx: -self.tx / self.sx,
        }
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}

impl<T> Mul<&crate::TLBR_<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = crate::TLBR_<T>;

    fn mul(self, rhs: &crate::TLBR_<T>) -> Self::Output {
        rhs.transform(self)
    }
}

impl<T> Mul<&CyCxHW<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = CyCxHW<T>;

    fn mul(self, rhs: &CyCxHW<T>) -> Self::Output {
        rhs.transform(self)
    }
}

/// Composition, `(a * b) * x == a * (b * x)`.
impl<T> Mul<&Transform<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = Transform<T>;

    fn mul(self, rhs: &Transform<T>) -> Self::Output {
        Transform {
            sy: self.sy * rhs.sy,
            sx: self.sx * rhs.sx,
            ty: rhs.ty * self.sy + self.ty,
            tx: rhs.tx * self.sx + self.tx,
        }
    }
}
