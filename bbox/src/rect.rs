use super::{CyCxHW, TLBR};
use crate::common::*;

/// The generic axis-aligned rectangle.
///
/// The corner form is TLBR, that is `(y_min, x_min, y_max, x_max)`. The center
/// form is stored as CyCxHW, while arrays crossing the crate boundary use the
/// `(x_center, y_center, width, height)` ordering.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_xcycwh(xcycwh: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized,
    {
        let [cx, cy, w, h] = xcycwh;
        Self::try_from_cycxhw([cy, cx, h, w])
    }
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd + Copy,
{
    fn from_tlbr(tlbr: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlbr(tlbr).unwrap()
    }

    fn from_tlhw(tlhw: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlhw(tlhw).unwrap()
    }

    fn from_cycxhw(cycxhw: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_cycxhw(cycxhw).unwrap()
    }

    fn from_xcycwh(xcycwh: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_xcycwh(xcycwh).unwrap()
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    fn cycxhw(&self) -> [Self::Type; 4] {
        [self.cy(), self.cx(), self.h(), self.w()]
    }

    fn xcycwh(&self) -> [Self::Type; 4] {
        [self.cx(), self.cy(), self.w(), self.h()]
    }

    fn hw(&self) -> [Self::Type; 2] {
        [self.h(), self.w()]
    }

    fn to_tlbr(&self) -> TLBR<Self::Type> {
        TLBR {
            t: self.t(),
            l: self.l(),
            b: self.b(),
            r: self.r(),
        }
    }

    fn to_cycxhw(&self) -> CyCxHW<Self::Type> {
        CyCxHW {
            cy: self.cy(),
            cx: self.cx(),
            h: self.h(),
            w: self.w(),
        }
    }

    fn area(&self) -> Self::Type {
        self.h() * self.w()
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    /// Compute the smallest box enclosing both boxes.
    fn closure_with<R>(&self, other: &R) -> TLBR<Self::Type>
    where
        R: Rect<Type = Self::Type>,
    {
        TLBR {
            t: self.t().min(other.t()),
            l: self.l().min(other.l()),
            b: self.b().max(other.b()),
            r: self.r().max(other.r()),
        }
    }

    fn intersect_with<R>(&self, other: &R) -> Option<TLBR<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let t = self.t().max(other.t());
        let l = self.l().max(other.l());
        let b = self.b().min(other.b());
        let r = self.r().min(other.r());
        (b > t && r > l).then(|| TLBR { t, l, b, r })
    }

    fn intersection_area_with<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        self.intersect_with(other)
            .map(|rect| rect.area())
            .unwrap_or_else(<Self::Type as Zero>::zero)
    }

    /// Squared Euclidean distance between box centers.
    fn center_distance_square_to<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        (self.cy() - other.cy()).powi(2) + (self.cx() - other.cx()).powi(2)
    }

    fn diagonal_square(&self) -> Self::Type {
        self.h().powi(2) + self.w().powi(2)
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd + Copy,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}
