use crate::{common::*, CyCxHW};

/// Box size, e.g. an anchor prior or a box shape with its position dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HW<T> {
    h: T,
    w: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "height and width parameters must be non-negative"
        );
        Ok(Self { h, w })
    }

    /// Build from the `(width, height)` ordering used by anchor lists.
    pub fn try_from_wh(wh: [T; 2]) -> Result<Self> {
        let [w, h] = wh;
        Self::try_from_hw([h, w])
    }

    pub fn from_hw(hw: [T; 2]) -> Self {
        Self::try_from_hw(hw).unwrap()
    }

    pub fn area(&self) -> T {
        self.w * self.h
    }

    pub fn w(&self) -> T {
        self.w
    }

    pub fn h(&self) -> T {
        self.h
    }

    pub fn wh(&self) -> [T; 2] {
        [self.w, self.h]
    }

    /// Place this size as a box centered at the origin.
    pub fn to_cycxhw_at_origin(&self) -> CyCxHW<T> {
        CyCxHW {
            cy: T::zero(),
            cx: T::zero(),
            h: self.h,
            w: self.w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn size_area() {
        let s1 = HW::from_hw([3.0, 2.0]);
        let area: f64 = s1.area();
        assert_abs_diff_eq!(area, 6.0);
    }

    #[test]
    fn wh_ordering() {
        let size = HW::try_from_wh([10.0, 13.0]).unwrap();
        assert_abs_diff_eq!(size.w(), 10.0);
        assert_abs_diff_eq!(size.h(), 13.0);
        assert!(HW::try_from_wh([-1.0, 2.0]).is_err());
    }
}
