use crate::{common::*, element::Element, rect::Rect, Transform, TLBR};

/// Unchecked bounding box in TLBR format.
///
/// This is the raw corner-form record as it comes out of a decoder. Nothing
/// prevents `b < t` or `r < l`; consumers either validate it through
/// [`TLBR::try_from`] or work on the raw coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TLBR_<T> {
    pub t: T,
    pub l: T,
    pub b: T,
    pub r: T,
}

impl<T> TLBR_<T>
where
    T: Copy + Num,
{
    pub fn zero() -> Self {
        Self {
            t: T::zero(),
            l: T::zero(),
            b: T::zero(),
            r: T::zero(),
        }
    }

    pub fn from_tlbr(tlbr: [T; 4]) -> Self {
        let [t, l, b, r] = tlbr;
        Self { t, l, b, r }
    }

    pub fn tlbr(&self) -> [T; 4] {
        [self.t, self.l, self.b, self.r]
    }

    pub fn h(&self) -> T {
        self.b - self.t
    }

    pub fn w(&self) -> T {
        self.r - self.l
    }

    pub fn cy(&self) -> T {
        (self.t + self.b) / (T::one() + T::one())
    }

    pub fn cx(&self) -> T {
        (self.l + self.r) / (T::one() + T::one())
    }

    /// The `(x_center, y_center, width, height)` parameters.
    pub fn xcycwh(&self) -> [T; 4] {
        [self.cx(), self.cy(), self.w(), self.h()]
    }

    pub fn transform(&self, transform: &Transform<T>) -> Self {
        Self {
            t: self.t * transform.sy + transform.ty,
            l: self.l * transform.sx + transform.tx,
            b: self.b * transform.sy + transform.ty,
            r: self.r * transform.sx + transform.tx,
        }
    }
}

impl<T> From<&TLBR<T>> for TLBR_<T>
where
    T: Copy + Num + PartialOrd,
{
    fn from(from: &TLBR<T>) -> Self {
        Self {
            t: from.t(),
            l: from.l(),
            b: from.b(),
            r: from.r(),
        }
    }
}

impl<T> TryFrom<TLBR_<T>> for TLBR<T>
where
    T: Element,
{
    type Error = anyhow::Error;

    fn try_from(from: TLBR_<T>) -> Result<Self, Self::Error> {
        Self::try_from(&from)
    }
}

impl<T> TryFrom<&TLBR_<T>> for TLBR<T>
where
    T: Element,
{
    type Error = anyhow::Error;

    fn try_from(from: &TLBR_<T>) -> Result<Self, Self::Error> {
        let TLBR_ { t, l, b, r } = *from;
        Self::try_from_tlbr([t, l, b, r])
    }
}
