//! Safe bounding box types, format conversions and overlap metrics.

mod common;

pub mod array;

pub mod into_tlbr;
pub use into_tlbr::*;

pub use transform::*;
mod transform;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub use cycxhw::*;
pub mod cycxhw;

pub use hw::*;
pub mod hw;

pub use element::*;
pub mod element;

pub use metric::*;
pub mod metric;

pub mod prelude {
    pub use crate::rect::{Rect, RectFloat, RectNum};
}
