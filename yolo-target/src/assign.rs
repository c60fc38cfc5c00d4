//! Scale and slot resolution of matched anchors.
//!
//! The resolved assignments of each scale form an ordered list. Applying
//! them in order reproduces the last-write-wins behavior on shared cells.

use crate::{common::*, AnchorMatch, ScaleConfig};

/// An output scale with its anchor mask and grid size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    pub level: usize,
    /// Global anchor indices owned by the scale. The position of an anchor
    /// in the mask is its slot.
    pub mask: Vec<usize>,
    pub grid_h: usize,
    pub grid_w: usize,
}

impl Scale {
    pub fn num_slots(&self) -> usize {
        self.mask.len()
    }

    /// The `(row, col)` cell containing a normalized center.
    pub fn cell_of(&self, cx: f64, cy: f64) -> (usize, usize) {
        let row = ((cy * self.grid_h as f64).floor().max(0.0) as usize).min(self.grid_h - 1);
        let col = ((cx * self.grid_w as f64).floor().max(0.0) as usize).min(self.grid_w - 1);
        (row, col)
    }
}

/// One write into a scale grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub instance: usize,
    pub rank: usize,
    pub anchor: usize,
    pub slot: usize,
    pub row: usize,
    pub col: usize,
    pub iou: f64,
    /// The number of matched anchors of the instance owned by this scale.
    pub reps: usize,
    pub is_alternate: bool,
}

/// The ordered writes of one scale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScalePlan {
    pub assignments: Vec<Assignment>,
    /// Writes discarded after the capacity was reached.
    pub num_dropped: usize,
}

/// The set of output scales, validated against the anchor list.
#[derive(Debug, Clone)]
pub struct ScaleLayout {
    scales: Vec<Scale>,
    /// `(scale_index, slot)` owning each global anchor index.
    owners: Vec<(usize, usize)>,
}

impl ScaleLayout {
    /// Resolve scales for an image size.
    ///
    /// The grid of a level is the image size, rounded down to a multiple of
    /// the coarsest stride, divided by `2^level`. The masks must partition
    /// the anchor indices `0..num_anchors`.
    pub fn new(
        image_h: usize,
        image_w: usize,
        num_anchors: usize,
        configs: &[ScaleConfig],
    ) -> Result<Self> {
        ensure!(!configs.is_empty(), "at least one scale is required");

        let mut masks: IndexMap<usize, &[usize]> = IndexMap::new();
        for ScaleConfig { level, mask } in configs {
            ensure!(!mask.is_empty(), "the mask of level {} is empty", level);
            ensure!(*level < 32, "level {} is too large", level);
            if masks.insert(*level, mask).is_some() {
                bail!("level {} is specified more than once", level);
            }
        }

        let max_level = masks.keys().cloned().max().unwrap_or(0);
        let max_stride = 1usize << max_level;
        let image_h = image_h / max_stride * max_stride;
        let image_w = image_w / max_stride * max_stride;
        ensure!(
            image_h > 0 && image_w > 0,
            "the image size is smaller than the stride {} of level {}",
            max_stride,
            max_level
        );

        let mut owners = vec![None; num_anchors];
        let scales: Vec<_> = masks
            .into_iter()
            .enumerate()
            .map(|(scale_index, (level, mask))| {
                for (slot, &anchor) in mask.iter().enumerate() {
                    ensure!(
                        anchor < num_anchors,
                        "anchor index {} in the mask of level {} is out of range",
                        anchor,
                        level
                    );
                    ensure!(
                        owners[anchor].is_none(),
                        "anchor index {} belongs to more than one mask",
                        anchor
                    );
                    owners[anchor] = Some((scale_index, slot));
                }

                Ok(Scale {
                    level,
                    mask: mask.to_vec(),
                    grid_h: image_h >> level,
                    grid_w: image_w >> level,
                })
            })
            .collect::<Result<_>>()?;

        let owners: Vec<_> = owners
            .into_iter()
            .enumerate()
            .map(|(anchor, owner)| {
                owner.with_context(|| format!("anchor index {} is not in any mask", anchor))
            })
            .collect::<Result<_>>()?;

        Ok(Self { scales, owners })
    }

    pub fn scales(&self) -> &[Scale] {
        &self.scales
    }

    /// The `(scale_index, slot)` of a global anchor index.
    pub fn owner_of(&self, anchor: usize) -> (usize, usize) {
        self.owners[anchor]
    }

    /// Build the ordered writes of every scale.
    ///
    /// Primary assignments, the best anchor of each instance, come first in
    /// ascending instance order. With `use_tie_breaker`, they are followed by
    /// the alternate anchors above the threshold on scales other than the
    /// primary one, by instance then rank. Writes beyond `capacity` are
    /// dropped.
    pub fn plan(
        &self,
        matches: &[AnchorMatch],
        centers: &[[f64; 2]],
        use_tie_breaker: bool,
        capacity: usize,
    ) -> Vec<ScalePlan> {
        self.scales
            .iter()
            .enumerate()
            .map(|(scale_index, scale)| {
                let mut primary = vec![];
                let mut alternate = vec![];

                for (instance, (matched, &[cx, cy])) in matches.iter().zip(centers).enumerate() {
                    let best = match matched.best() {
                        Some(best) => best,
                        None => continue,
                    };
                    let (primary_scale, _) = self.owner_of(best);
                    let reps = matched
                        .iter_valid()
                        .filter(|&(_, anchor, _)| self.owner_of(anchor).0 == scale_index)
                        .count();
                    let (row, col) = scale.cell_of(cx, cy);

                    for (rank, anchor, iou) in matched.iter_valid() {
                        let (owner, slot) = self.owner_of(anchor);
                        if owner != scale_index {
                            continue;
                        }
                        let is_alternate = rank != 0;
                        if is_alternate && !(use_tie_breaker && primary_scale != scale_index) {
                            continue;
                        }

                        let assignment = Assignment {
                            instance,
                            rank,
                            anchor,
                            slot,
                            row,
                            col,
                            iou,
                            reps,
                            is_alternate,
                        };
                        if is_alternate {
                            alternate.push(assignment);
                        } else {
                            primary.push(assignment);
                        }
                    }
                }

                let total = primary.len() + alternate.len();
                let assignments: Vec<_> = primary
                    .into_iter()
                    .chain(alternate)
                    .take(capacity)
                    .collect();
                let num_dropped = total - assignments.len();

                if num_dropped > 0 {
                    warn!(
                        "{} assignments on level {} exceed the capacity {} and are dropped",
                        num_dropped, scale.level, capacity
                    );
                }

                ScalePlan {
                    assignments,
                    num_dropped,
                }
            })
            .collect()
    }
}
