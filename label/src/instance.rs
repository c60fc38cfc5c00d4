use crate::common::*;

/// The class id of a padding slot.
pub const PADDING_CLASS: i64 = -1;

/// One annotated object.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance<T> {
    pub bbox: TLBR_<T>,
    pub class: i64,
    pub area: T,
    pub is_crowd: bool,
}

impl<T> Instance<T>
where
    T: Float,
{
    /// Build an instance whose area is the box area.
    pub fn new(bbox: TLBR_<T>, class: i64) -> Self {
        Self {
            area: (bbox.h() * bbox.w()).abs(),
            bbox,
            class,
            is_crowd: false,
        }
    }

    fn padding() -> Self {
        Self {
            bbox: TLBR_::zero(),
            class: PADDING_CLASS,
            area: T::zero(),
            is_crowd: false,
        }
    }
}

/// Instances of one image, padded or truncated to a fixed capacity.
///
/// Boxes are in corner form and are not validated, since upstream
/// augmentation may produce flipped coordinates. Padding slots hold zero
/// boxes, zero areas and the class [PADDING_CLASS].
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSet<T> {
    boxes: Vec<TLBR_<T>>,
    classes: Vec<i64>,
    areas: Vec<T>,
    is_crowd: Vec<bool>,
    num_detections: usize,
}

impl<T> InstanceSet<T>
where
    T: Float,
{
    pub fn from_instances<I>(instances: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = Instance<T>>,
    {
        let mut boxes = Vec::with_capacity(capacity);
        let mut classes = Vec::with_capacity(capacity);
        let mut areas = Vec::with_capacity(capacity);
        let mut is_crowd = Vec::with_capacity(capacity);
        let mut num_detections = 0;

        for instance in instances {
            num_detections += 1;
            if num_detections > capacity {
                continue;
            }
            boxes.push(instance.bbox);
            classes.push(instance.class);
            areas.push(instance.area);
            is_crowd.push(instance.is_crowd);
        }

        if num_detections > capacity {
            warn!(
                "{} instances exceed the capacity {}, the excess is dropped",
                num_detections, capacity
            );
        }

        let pad = Instance::padding();
        boxes.resize(capacity, pad.bbox);
        classes.resize(capacity, pad.class);
        areas.resize(capacity, pad.area);
        is_crowd.resize(capacity, pad.is_crowd);

        Self {
            boxes,
            classes,
            areas,
            is_crowd,
            num_detections,
        }
    }

    /// Build from a `[num_boxes, 4]` corner-form box array and its classes.
    ///
    /// Only the first `num_detections` rows are treated as real instances.
    pub fn from_arrays(
        boxes: ArrayViewD<'_, T>,
        classes: &[i64],
        num_detections: usize,
        capacity: usize,
    ) -> Result<Self> {
        let boxes = bbox::array::unchecked_tlbr_from_array(boxes)?;
        ensure!(
            boxes.len() == classes.len(),
            "the number of boxes ({}) and classes ({}) mismatch",
            boxes.len(),
            classes.len()
        );
        ensure!(
            num_detections <= boxes.len(),
            "num_detections ({}) exceeds the number of boxes ({})",
            num_detections,
            boxes.len()
        );

        let instances = boxes
            .into_iter()
            .zip(classes.iter().cloned())
            .take(num_detections)
            .map(|(bbox, class)| Instance::new(bbox, class));
        Ok(Self::from_instances(instances, capacity))
    }

    pub fn capacity(&self) -> usize {
        self.boxes.len()
    }

    /// The true instance count, which may exceed the capacity.
    pub fn num_detections(&self) -> usize {
        self.num_detections
    }

    /// The number of real instances held in the set.
    pub fn num_valid(&self) -> usize {
        self.num_detections.min(self.capacity())
    }

    pub fn boxes(&self) -> &[TLBR_<T>] {
        &self.boxes
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn areas(&self) -> &[T] {
        &self.areas
    }

    pub fn is_crowd(&self) -> &[bool] {
        &self.is_crowd
    }

    /// Per-slot validity, true for real instances and false for padding.
    pub fn mask(&self) -> Vec<bool> {
        let num_valid = self.num_valid();
        (0..self.capacity()).map(|index| index < num_valid).collect()
    }

    /// Iterate over `(slot, box, class)` of real instances.
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, &TLBR_<T>, i64)> + '_ {
        self.boxes
            .iter()
            .zip(self.classes.iter().cloned())
            .take(self.num_valid())
            .enumerate()
            .map(|(index, (bbox, class))| (index, bbox, class))
    }

    /// The `[capacity, 4]` corner-form box array.
    pub fn boxes_array(&self) -> Array2<T> {
        Array2::from_shape_fn((self.capacity(), 4), |(index, col)| {
            self.boxes[index].tlbr()[col]
        })
    }

    /// Remap boxes from a canvas of `src_size` into an aspect-preserving,
    /// centered canvas of `tgt_size`.
    ///
    /// Returns the remapped set and the applied transform. Boxes whose height
    /// becomes zero are zeroed.
    pub fn letterbox(&self, src_size: HW<T>, tgt_size: HW<T>) -> Result<(Self, Transform<T>)> {
        let transform = Transform::try_from_sizes_letterbox(&src_size, &tgt_size)
            .context("unable to build the letterbox transform")?;
        let area_scale = transform.sy * transform.sx;
        let num_valid = self.num_valid();

        let (boxes, areas): (Vec<_>, Vec<_>) = self
            .boxes
            .iter()
            .zip(self.areas.iter())
            .enumerate()
            .map(|(index, (bbox, &area))| {
                if index >= num_valid {
                    return (*bbox, area);
                }
                let new_box = &transform * bbox;
                if new_box.h() == T::zero() {
                    (TLBR_::zero(), T::zero())
                } else {
                    (new_box, area * area_scale)
                }
            })
            .unzip();

        let output = Self {
            boxes,
            areas,
            ..self.clone()
        };
        Ok((output, transform))
    }
}
