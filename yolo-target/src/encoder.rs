use crate::{
    common::*, AnchorMatch, AnchorMatcher, AnchorMatcherInit, ScaleConfig, ScaleLayout, ScalePlan,
};

/// The length of an assignment record,
/// `(x, y, w, h, objectness, class, iou, reps)`.
pub const RECORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct YoloTargetEncoderInit {
    pub image_w: usize,
    pub image_h: usize,
    pub num_classes: usize,
    /// Subtracted from input class ids, 1 for 1-based ids.
    pub class_id_offset: i64,
    pub max_num_instances: usize,
    pub anchors: Vec<[f64; 2]>,
    pub scales: Vec<ScaleConfig>,
    pub iou_thresh: f64,
    pub use_tie_breaker: bool,
    pub dtype: String,
}

impl YoloTargetEncoderInit {
    pub fn build(self) -> Result<YoloTargetEncoder> {
        let Self {
            image_w,
            image_h,
            num_classes,
            class_id_offset,
            max_num_instances,
            anchors,
            scales,
            iou_thresh,
            use_tie_breaker,
            dtype,
        } = self;

        let precision = Precision::parse(&dtype)?;
        ensure!(num_classes > 0, "num_classes must be positive");
        ensure!(max_num_instances > 0, "max_num_instances must be positive");

        let num_anchors = anchors.len();
        let matcher = AnchorMatcherInit {
            anchors,
            image_w,
            image_h,
            iou_thresh,
        }
        .build()?;
        let layout = ScaleLayout::new(image_h, image_w, num_anchors, &scales)?;

        Ok(YoloTargetEncoder {
            matcher,
            layout,
            num_classes,
            class_id_offset,
            max_num_instances,
            use_tie_breaker,
            precision,
        })
    }
}

/// Encodes instance sets into per-scale YOLO grid targets.
#[derive(Debug, Clone)]
pub struct YoloTargetEncoder {
    matcher: AnchorMatcher,
    layout: ScaleLayout,
    num_classes: usize,
    class_id_offset: i64,
    max_num_instances: usize,
    use_tie_breaker: bool,
    precision: Precision,
}

/// The targets of one output scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTarget {
    pub level: usize,
    /// `[max_num_instances, 3]` rows of `(row, col, slot)`, zero padded.
    pub indices: Array2<i32>,
    /// `[max_num_instances, RECORD_LEN]` records aligned with `indices`, zero padded.
    pub records: Array2<f32>,
    /// `[grid_h, grid_w, num_slots, RECORD_LEN]` records scattered into the grid.
    pub grid: Array4<f32>,
    /// `[grid_h, grid_w, num_slots, 1]` objectness map.
    pub objectness: Array4<f32>,
    pub num_written: usize,
    pub num_dropped: usize,
}

/// The encoded targets of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct YoloTarget {
    /// `[max_num_instances, num_anchors]` ranked anchor indices, -1 for none.
    pub best_anchors: Array2<i32>,
    /// `[max_num_instances, num_anchors]` IoU values aligned with `best_anchors`.
    pub best_iou_match: Array2<f32>,
    pub scales: Vec<ScaleTarget>,
}

impl YoloTargetEncoder {
    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn layout(&self) -> &ScaleLayout {
        &self.layout
    }

    pub fn matcher(&self) -> &AnchorMatcher {
        &self.matcher
    }

    pub fn max_num_instances(&self) -> usize {
        self.max_num_instances
    }

    /// Encode one image whose boxes are normalized to `[0, 1]`.
    ///
    /// The class field of a record holds the class id minus `class_id_offset`.
    pub fn encode(&self, instances: &InstanceSet<f32>) -> YoloTarget {
        let capacity = self.max_num_instances;
        let num_anchors = self.matcher.num_anchors();

        let mut boxes = vec![[0f64; 4]; capacity];
        let mut classes = vec![0i64; capacity];

        for (index, bbox, class) in instances.iter_valid().take(capacity) {
            let class_index = class - self.class_id_offset;
            if class_index < 0 || class_index >= self.num_classes as i64 {
                warn!(
                    "class {} of instance {} is out of range, the instance is skipped",
                    class, index
                );
                continue;
            }
            let [cx, cy, w, h] = bbox.xcycwh();
            boxes[index] = [cx as f64, cy as f64, w as f64, h as f64];
            classes[index] = class_index;
        }

        let matches = self.matcher.match_boxes(&boxes);
        let centers: Vec<_> = boxes.iter().map(|&[cx, cy, _, _]| [cx, cy]).collect();
        let plans = self
            .layout
            .plan(&matches, &centers, self.use_tie_breaker, capacity);

        let (best_anchors, best_iou_match) = Self::match_arrays(&matches, num_anchors);
        let scales = self
            .layout
            .scales()
            .iter()
            .zip(plans)
            .map(|(scale, plan)| {
                let ScalePlan {
                    assignments,
                    num_dropped,
                } = plan;

                let mut target = ScaleTarget {
                    level: scale.level,
                    indices: Array2::zeros((capacity, 3)),
                    records: Array2::zeros((capacity, RECORD_LEN)),
                    grid: Array4::zeros((scale.grid_h, scale.grid_w, scale.num_slots(), RECORD_LEN)),
                    objectness: Array4::zeros((scale.grid_h, scale.grid_w, scale.num_slots(), 1)),
                    num_written: assignments.len(),
                    num_dropped,
                };

                // writes are applied in order, later ones replace earlier ones
                for (nth, assignment) in assignments.iter().enumerate() {
                    let [x, y, w, h] = boxes[assignment.instance];
                    let record = [
                        x as f32,
                        y as f32,
                        w as f32,
                        h as f32,
                        1.0,
                        classes[assignment.instance] as f32,
                        assignment.iou as f32,
                        assignment.reps as f32,
                    ];
                    let (row, col, slot) = (assignment.row, assignment.col, assignment.slot);

                    target.indices[[nth, 0]] = row as i32;
                    target.indices[[nth, 1]] = col as i32;
                    target.indices[[nth, 2]] = slot as i32;
                    for (field, &value) in record.iter().enumerate() {
                        target.records[[nth, field]] = value;
                        target.grid[[row, col, slot, field]] = value;
                    }
                    target.objectness[[row, col, slot, 0]] = 1.0;
                }

                debug!(
                    "level {}: {} assignments written, {} dropped",
                    scale.level, target.num_written, target.num_dropped
                );
                target
            })
            .collect();

        YoloTarget {
            best_anchors,
            best_iou_match,
            scales,
        }
    }

    /// Encode many images in parallel.
    pub fn encode_batch(&self, batch: &[InstanceSet<f32>]) -> Vec<YoloTarget> {
        batch
            .par_iter()
            .map(|instances| self.encode(instances))
            .collect()
    }

    fn match_arrays(matches: &[AnchorMatch], num_anchors: usize) -> (Array2<i32>, Array2<f32>) {
        let best_anchors = Array2::from_shape_fn((matches.len(), num_anchors), |(index, rank)| {
            matches[index].ranked[rank].map(|anchor| anchor as i32).unwrap_or(-1)
        });
        let best_iou_match = Array2::from_shape_fn((matches.len(), num_anchors), |(index, rank)| {
            matches[index].ious[rank] as f32
        });
        (best_anchors, best_iou_match)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use label::Instance;

    fn instance(xcycwh: [f32; 4], class: i64) -> Instance<f32> {
        let [cx, cy, w, h] = xcycwh;
        Instance::new(
            TLBR_::from_tlbr([cy - h / 2.0, cx - w / 2.0, cy + h / 2.0, cx + w / 2.0]),
            class,
        )
    }

    fn two_scale_config() -> Config {
        Config {
            image_w: 64,
            image_h: 64,
            num_classes: 3,
            class_id_offset: 0,
            max_num_instances: 4,
            anchors: vec![[8.0, 8.0], [16.0, 16.0], [32.0, 32.0], [64.0, 64.0]],
            scales: vec![
                ScaleConfig {
                    level: 3,
                    mask: vec![0, 1],
                },
                ScaleConfig {
                    level: 4,
                    mask: vec![2, 3],
                },
            ],
            ..Config::default()
        }
    }

    #[test]
    fn record_layout() {
        let encoder = two_scale_config().encoder_init().build().unwrap();
        let instances = InstanceSet::from_instances(vec![instance([0.375, 0.625, 0.25, 0.25], 2)], 4);
        let target = encoder.encode(&instances);

        // a 16x16 box matches anchor 1 exactly
        assert_eq!(target.best_anchors.row(0)[0], 1);
        assert_eq!(target.best_anchors.row(1).to_vec(), vec![-1; 4]);

        let fine = &target.scales[0];
        assert_eq!(fine.num_written, 1);
        assert_eq!(fine.indices.row(0).to_vec(), vec![5, 3, 1]);
        let record = fine.records.row(0).to_vec();
        // anchors 0 and 1 both clear the threshold on this scale
        assert_eq!(&record[..], &[0.375, 0.625, 0.25, 0.25, 1.0, 2.0, 1.0, 2.0]);
        assert_eq!(fine.grid[[5, 3, 1, 5]], 2.0);

        // anchor 2 is an alternate on the coarse scale
        let coarse = &target.scales[1];
        assert_eq!(coarse.num_written, 1);
        assert_eq!(coarse.indices.row(0).to_vec(), vec![2, 1, 0]);
        assert_eq!(coarse.records[[0, 7]], 1.0);
        assert_eq!(fine.records.row(1).to_vec(), vec![0.0; RECORD_LEN]);
    }

    #[test]
    fn same_cell_writes_keep_the_last_instance() {
        let encoder = two_scale_config().encoder_init().build().unwrap();
        let instances = InstanceSet::from_instances(
            vec![
                instance([0.3, 0.3, 0.25, 0.25], 0),
                instance([0.31, 0.31, 0.26, 0.26], 1),
            ],
            4,
        );
        let target = encoder.encode(&instances);
        let fine = &target.scales[0];

        assert_eq!(fine.num_written, 2);
        assert_eq!(fine.indices.row(0), fine.indices.row(1));
        assert_eq!(fine.grid[[2, 2, 1, 5]], 1.0);
        assert_eq!(fine.objectness.sum(), 1.0);
    }

    #[test]
    fn out_of_range_classes_are_not_encoded() {
        let encoder = two_scale_config().encoder_init().build().unwrap();
        let instances = InstanceSet::from_instances(vec![instance([0.5, 0.5, 0.25, 0.25], 7)], 4);
        let target = encoder.encode(&instances);
        assert!(target.scales.iter().all(|scale| scale.num_written == 0));
        assert_eq!(target.best_anchors[[0, 0]], -1);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let build = |config: Config| config.encoder_init().build();
        assert!(build(Config {
            dtype: "int8".into(),
            ..Config::default()
        })
        .is_err());
        assert!(build(Config {
            num_classes: 0,
            ..Config::default()
        })
        .is_err());
        assert!(build(Config {
            scales: vec![ScaleConfig {
                level: 3,
                mask: vec![0, 1, 2],
            }],
            ..Config::default()
        })
        .is_err());
    }
}
