//! Shape matching between instances and anchor priors.

use crate::common::*;

#[derive(Debug, Clone)]
pub struct AnchorMatcherInit {
    /// Anchor priors in pixels, in `(width, height)` order.
    pub anchors: Vec<[f64; 2]>,
    pub image_w: usize,
    pub image_h: usize,
    pub iou_thresh: f64,
}

impl AnchorMatcherInit {
    pub fn build(self) -> Result<AnchorMatcher> {
        let Self {
            anchors,
            image_w,
            image_h,
            iou_thresh,
        } = self;

        ensure!(!anchors.is_empty(), "at least one anchor is required");
        ensure!(
            image_w > 0 && image_h > 0,
            "image_w and image_h must be positive"
        );
        ensure!(
            (0.0..=1.0).contains(&iou_thresh),
            "iou_thresh must be in range [0, 1], but get {}",
            iou_thresh
        );

        let anchors: Vec<_> = anchors
            .iter()
            .enumerate()
            .map(|(index, &[w, h])| {
                ensure!(
                    w > 0.0 && h > 0.0,
                    "anchor {} has non-positive size ({}, {})",
                    index,
                    w,
                    h
                );
                let size = HW::try_from_wh([w / image_w as f64, h / image_h as f64])?;
                Ok(size.to_cycxhw_at_origin())
            })
            .collect::<Result<_>>()?;

        Ok(AnchorMatcher {
            anchors,
            iou_thresh,
        })
    }
}

/// Ranks anchor priors for each instance by the IoU of their shapes.
#[derive(Debug, Clone)]
pub struct AnchorMatcher {
    /// Normalized anchors placed at the origin.
    anchors: Vec<CyCxHW<f64>>,
    iou_thresh: f64,
}

/// The ranked anchors of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorMatch {
    /// Global anchor indices by descending IoU. `None` marks anchors below
    /// the threshold. The best anchor is kept regardless of the threshold.
    pub ranked: Vec<Option<usize>>,
    /// IoU values sorted in descending order, aligned with `ranked`.
    pub ious: Vec<f64>,
}

impl AnchorMatch {
    fn invalid(num_anchors: usize) -> Self {
        Self {
            ranked: vec![None; num_anchors],
            ious: vec![0.0; num_anchors],
        }
    }

    /// Degenerate instances are not matched to any anchor.
    pub fn is_valid(&self) -> bool {
        matches!(self.ranked.first(), Some(Some(_)))
    }

    pub fn best(&self) -> Option<usize> {
        self.ranked.first().cloned().flatten()
    }

    /// Iterate over `(rank, anchor_index, iou)` of anchors above the threshold.
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.ranked
            .iter()
            .zip(self.ious.iter().cloned())
            .enumerate()
            .filter_map(|(rank, (anchor, iou))| Some((rank, (*anchor)?, iou)))
    }
}

impl AnchorMatcher {
    pub fn num_anchors(&self) -> usize {
        self.anchors.len()
    }

    pub fn iou_thresh(&self) -> f64 {
        self.iou_thresh
    }

    /// Rank anchors for boxes in normalized `(x_center, y_center, width, height)` form.
    ///
    /// Boxes with non-positive width or height, or with a center outside
    /// `[0, 1)`, get an all-`None` match.
    pub fn match_boxes(&self, boxes: &[[f64; 4]]) -> Vec<AnchorMatch> {
        let num_anchors = self.num_anchors();

        let valid_shapes: Vec<_> = boxes
            .iter()
            .enumerate()
            .filter(|(_, xcycwh)| Self::is_matchable(xcycwh))
            .map(|(index, &[_, _, w, h])| (index, HW::from_hw([h, w]).to_cycxhw_at_origin()))
            .collect();
        let (indices, shapes): (Vec<_>, Vec<_>) = valid_shapes.into_iter().unzip();
        let iou_matrix = bbox::pairwise_iou_matrix(&shapes, &self.anchors, BoxMetric::IoU);

        let mut matches = vec![AnchorMatch::invalid(num_anchors); boxes.len()];

        for (row, &index) in indices.iter().enumerate() {
            // stable, ties keep the lower anchor index first
            let (ranked, ious): (Vec<_>, Vec<_>) = iou_matrix
                .row(row)
                .iter()
                .cloned()
                .enumerate()
                .sorted_by(|(_, lhs), (_, rhs)| rhs.partial_cmp(lhs).unwrap_or(Ordering::Equal))
                .enumerate()
                .map(|(rank, (anchor, iou))| {
                    let keep = rank == 0 || iou >= self.iou_thresh;
                    (keep.then(|| anchor), iou)
                })
                .unzip();

            matches[index] = AnchorMatch { ranked, ious };
        }

        matches
    }

    fn is_matchable(xcycwh: &[f64; 4]) -> bool {
        let [cx, cy, w, h] = *xcycwh;
        w > 0.0 && h > 0.0 && (0.0..1.0).contains(&cx) && (0.0..1.0).contains(&cy)
    }
}
