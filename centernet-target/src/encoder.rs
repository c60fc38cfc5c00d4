use crate::{common::*, gaussian::gaussian_radius, GaussianSplat};

#[derive(Debug, Clone)]
pub struct HeatmapEncoderInit {
    pub image_w: usize,
    pub image_h: usize,
    pub output_w: usize,
    pub output_h: usize,
    pub num_classes: usize,
    pub max_num_instances: usize,
    pub use_gaussian_bump: bool,
    pub gaussian_rad: Option<usize>,
    pub gaussian_iou: f64,
    pub center_gaussian_scale: f64,
    pub class_id_offset: i64,
    pub clamp_heatmaps: bool,
    pub dtype: String,
}

impl HeatmapEncoderInit {
    pub fn build(self) -> Result<HeatmapEncoder> {
        let Self {
            image_w,
            image_h,
            output_w,
            output_h,
            num_classes,
            max_num_instances,
            use_gaussian_bump,
            gaussian_rad,
            gaussian_iou,
            center_gaussian_scale,
            class_id_offset,
            clamp_heatmaps,
            dtype,
        } = self;

        let precision = Precision::parse(&dtype)?;
        ensure!(
            image_w > 0 && image_h > 0,
            "image_w and image_h must be positive"
        );
        ensure!(
            output_w > 0 && output_h > 0,
            "output_w and output_h must be positive"
        );
        ensure!(num_classes > 0, "num_classes must be positive");
        ensure!(
            gaussian_iou > 0.0 && gaussian_iou < 1.0,
            "gaussian_iou must be in range (0, 1), but get {}",
            gaussian_iou
        );
        ensure!(
            center_gaussian_scale.is_finite() && center_gaussian_scale > 0.0,
            "center_gaussian_scale must be a positive number"
        );

        Ok(HeatmapEncoder {
            image_w,
            image_h,
            output_w,
            output_h,
            num_classes,
            max_num_instances,
            use_gaussian_bump,
            gaussian_rad,
            gaussian_iou,
            center_gaussian_scale,
            class_id_offset,
            clamp_heatmaps,
            precision,
        })
    }
}

/// Encodes instance sets into CenterNet training targets.
#[derive(Debug, Clone)]
pub struct HeatmapEncoder {
    image_w: usize,
    image_h: usize,
    output_w: usize,
    output_h: usize,
    num_classes: usize,
    max_num_instances: usize,
    use_gaussian_bump: bool,
    gaussian_rad: Option<usize>,
    gaussian_iou: f64,
    center_gaussian_scale: f64,
    class_id_offset: i64,
    clamp_heatmaps: bool,
    precision: Precision,
}

/// The encoded targets of one image.
///
/// Heatmaps are laid out as `[output_h, output_w, num_classes]`. Per-instance
/// targets have `max_num_instances` rows, zero for unused slots. Offsets are
/// `(x, y)` pairs, sizes are `(width, height)` pairs and box indices are
/// `(row, col)` pairs of the center cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterNetTarget {
    pub tl_heatmaps: Array3<f32>,
    pub br_heatmaps: Array3<f32>,
    pub ct_heatmaps: Array3<f32>,
    pub tl_offset: Array2<f32>,
    pub br_offset: Array2<f32>,
    pub ct_offset: Array2<f32>,
    pub size: Array2<f32>,
    pub box_mask: Array1<i32>,
    pub box_indices: Array2<i32>,
}

impl CenterNetTarget {
    fn zeros(output_h: usize, output_w: usize, num_classes: usize, capacity: usize) -> Self {
        let heatmap = Array3::zeros((output_h, output_w, num_classes));
        Self {
            tl_heatmaps: heatmap.clone(),
            br_heatmaps: heatmap.clone(),
            ct_heatmaps: heatmap,
            tl_offset: Array2::zeros((capacity, 2)),
            br_offset: Array2::zeros((capacity, 2)),
            ct_offset: Array2::zeros((capacity, 2)),
            size: Array2::zeros((capacity, 2)),
            box_mask: Array1::zeros(capacity),
            box_indices: Array2::zeros((capacity, 2)),
        }
    }

    pub fn num_boxes(&self) -> usize {
        self.box_mask.iter().filter(|&&flag| flag != 0).count()
    }
}

/// A box point scaled to the output grid and its enclosing cell.
#[derive(Debug, Clone, Copy)]
struct GridPoint {
    fy: f32,
    fx: f32,
    y: f32,
    x: f32,
}

impl GridPoint {
    fn new(y: f32, x: f32, height_ratio: f32, width_ratio: f32) -> Self {
        let fy = y * height_ratio;
        let fx = x * width_ratio;
        Self {
            fy,
            fx,
            y: fy.floor(),
            x: fx.floor(),
        }
    }

    fn offset(&self) -> [f32; 2] {
        [self.fx - self.x, self.fy - self.y]
    }

    fn cell(&self) -> (isize, isize) {
        (self.y as isize, self.x as isize)
    }
}

impl HeatmapEncoder {
    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn max_num_instances(&self) -> usize {
        self.max_num_instances
    }

    /// The `(height, width)` of the output heatmaps.
    pub fn output_hw(&self) -> (usize, usize) {
        (self.output_h, self.output_w)
    }

    pub fn encode(&self, instances: &InstanceSet<f32>) -> CenterNetTarget {
        let Self {
            image_w,
            image_h,
            output_w,
            output_h,
            num_classes,
            max_num_instances,
            ..
        } = *self;

        let mut target = CenterNetTarget::zeros(output_h, output_w, num_classes, max_num_instances);
        let width_ratio = output_w as f32 / image_w as f32;
        let height_ratio = output_h as f32 / image_h as f32;

        if instances.num_valid() > max_num_instances {
            warn!(
                "{} instances exceed the capacity {}, the excess is not encoded",
                instances.num_valid(),
                max_num_instances
            );
        }

        for (index, bbox, class) in instances.iter_valid().take(max_num_instances) {
            let class_index = class - self.class_id_offset;
            if class_index < 0 || class_index >= num_classes as i64 {
                warn!(
                    "class {} of instance {} is out of range, the instance is skipped",
                    class, index
                );
                continue;
            }
            let class_index = class_index as usize;

            let TLBR_ { t, l, b, r } = *bbox;
            let tl = GridPoint::new(t, l, height_ratio, width_ratio);
            let br = GridPoint::new(b, r, height_ratio, width_ratio);
            let ct = GridPoint::new((t + b) / 2.0, (l + r) / 2.0, height_ratio, width_ratio);

            let width = ((r - l) * width_ratio).ceil();
            let height = ((b - t) * height_ratio).ceil();

            if self.use_gaussian_bump {
                let radius = match self.gaussian_rad {
                    Some(radius) => radius,
                    None => gaussian_radius(height as f64, width as f64, self.gaussian_iou) as usize,
                };
                let splat = |point: &GridPoint, spread: f64| {
                    let (cy, cx) = point.cell();
                    GaussianSplat {
                        cy,
                        cx,
                        radius,
                        spread,
                    }
                };

                splat(&tl, 1.0).draw(target.tl_heatmaps.index_axis_mut(Axis(2), class_index));
                splat(&br, 1.0).draw(target.br_heatmaps.index_axis_mut(Axis(2), class_index));
                splat(&ct, self.center_gaussian_scale)
                    .draw(target.ct_heatmaps.index_axis_mut(Axis(2), class_index));
            } else {
                let [tl_row, tl_col] = self.clamp_cell(&tl);
                let [br_row, br_col] = self.clamp_cell(&br);
                let [ct_row, ct_col] = self.clamp_cell(&ct);
                target.tl_heatmaps[[tl_row, tl_col, class_index]] = 1.0;
                target.br_heatmaps[[br_row, br_col, class_index]] = 1.0;
                target.ct_heatmaps[[ct_row, ct_col, class_index]] = 1.0;
            }

            let write_pair = |array: &mut Array2<f32>, values: [f32; 2]| {
                array[[index, 0]] = values[0];
                array[[index, 1]] = values[1];
            };
            write_pair(&mut target.tl_offset, tl.offset());
            write_pair(&mut target.br_offset, br.offset());
            write_pair(&mut target.ct_offset, ct.offset());
            write_pair(&mut target.size, [width, height]);

            let [ct_row, ct_col] = self.clamp_cell(&ct);
            target.box_mask[index] = 1;
            target.box_indices[[index, 0]] = ct_row as i32;
            target.box_indices[[index, 1]] = ct_col as i32;
        }

        if self.clamp_heatmaps {
            for heatmap in [
                &mut target.tl_heatmaps,
                &mut target.br_heatmaps,
                &mut target.ct_heatmaps,
            ] {
                heatmap.mapv_inplace(|value| value.min(1.0));
            }
        }

        target
    }

    /// Encode many images in parallel.
    pub fn encode_batch(&self, batch: &[InstanceSet<f32>]) -> Vec<CenterNetTarget> {
        batch
            .par_iter()
            .map(|instances| self.encode(instances))
            .collect()
    }

    fn clamp_cell(&self, point: &GridPoint) -> [usize; 2] {
        let (row, col) = point.cell();
        let row = row.clamp(0, self.output_h as isize - 1) as usize;
        let col = col.clamp(0, self.output_w as isize - 1) as usize;
        [row, col]
    }
}
