//! Batching of encoder outputs into tensors.

use crate::common::*;
use centernet_target::CenterNetTarget;
use yolo_target::{ScaleTarget, YoloTarget};

/// The tensor kind of a precision selector.
pub fn precision_kind(precision: Precision) -> Kind {
    match precision {
        Precision::Float16 => Kind::Half,
        Precision::BFloat16 => Kind::BFloat16,
        Precision::Float32 => Kind::Float,
    }
}

fn array_to_tensor<S, D, A>(array: &ArrayBase<S, D>) -> Tensor
where
    S: Data<Elem = A>,
    D: Dimension,
    A: Element + Clone,
{
    let shape: Vec<i64> = array.shape().iter().map(|&size| size as i64).collect();
    let values: Vec<A> = array.iter().cloned().collect();
    Tensor::of_slice(&values).view(shape.as_slice())
}

/// Stack per-image arrays of equal shape along a new batch axis.
fn stack_arrays<'a, S, D, A, I>(name: &str, arrays: I, kind: Kind, device: Device) -> Result<Tensor>
where
    S: 'a + Data<Elem = A>,
    D: 'a + Dimension,
    A: Element + Clone,
    I: IntoIterator<Item = &'a ArrayBase<S, D>>,
{
    let arrays: Vec<_> = arrays.into_iter().collect();
    ensure!(!arrays.is_empty(), "cannot batch an empty list of '{}'", name);
    let shape = arrays[0].shape();
    ensure!(
        arrays.iter().all(|array| array.shape() == shape),
        "the shapes of '{}' differ across the batch",
        name
    );

    let tensors: Vec<_> = arrays.into_iter().map(array_to_tensor).collect();
    Ok(Tensor::stack(&tensors, 0).to_kind(kind).to_device(device))
}

/// Batched CenterNet targets.
#[derive(Debug)]
pub struct CenterNetTargetTensors {
    /// `[batch, height, width, num_classes]`
    pub tl_heatmaps: Tensor,
    pub br_heatmaps: Tensor,
    pub ct_heatmaps: Tensor,
    /// `[batch, max_num_instances, 2]` in `(x, y)` order
    pub tl_offset: Tensor,
    pub br_offset: Tensor,
    pub ct_offset: Tensor,
    /// `[batch, max_num_instances, 2]` in `(w, h)` order
    pub size: Tensor,
    /// `[batch, max_num_instances]`, 1 for real instances
    pub box_mask: Tensor,
    /// `[batch, max_num_instances, 2]` center cells in `(row, col)` order, `Int64`
    pub box_indices: Tensor,
}

impl CenterNetTargetTensors {
    pub fn from_targets(
        targets: &[CenterNetTarget],
        precision: Precision,
        device: Device,
    ) -> Result<Self> {
        let kind = precision_kind(precision);

        Ok(Self {
            tl_heatmaps: stack_arrays("tl_heatmaps", targets.iter().map(|t| &t.tl_heatmaps), kind, device)?,
            br_heatmaps: stack_arrays("br_heatmaps", targets.iter().map(|t| &t.br_heatmaps), kind, device)?,
            ct_heatmaps: stack_arrays("ct_heatmaps", targets.iter().map(|t| &t.ct_heatmaps), kind, device)?,
            tl_offset: stack_arrays("tl_offset", targets.iter().map(|t| &t.tl_offset), kind, device)?,
            br_offset: stack_arrays("br_offset", targets.iter().map(|t| &t.br_offset), kind, device)?,
            ct_offset: stack_arrays("ct_offset", targets.iter().map(|t| &t.ct_offset), kind, device)?,
            size: stack_arrays("size", targets.iter().map(|t| &t.size), kind, device)?,
            box_mask: stack_arrays("box_mask", targets.iter().map(|t| &t.box_mask), kind, device)?,
            box_indices: stack_arrays(
                "box_indices",
                targets.iter().map(|t| &t.box_indices),
                Kind::Int64,
                device,
            )?,
        })
    }

    pub fn batch_size(&self) -> i64 {
        self.ct_heatmaps.size()[0]
    }
}

/// Batched targets of one YOLO output scale.
#[derive(Debug)]
pub struct ScaleTargetTensors {
    pub level: usize,
    /// `[batch, max_num_instances, 3]` in `(row, col, slot)` order, `Int64`
    pub indices: Tensor,
    /// `[batch, max_num_instances, 8]`
    pub records: Tensor,
    /// `[batch, grid_h, grid_w, num_slots, 8]`
    pub grid: Tensor,
    /// `[batch, grid_h, grid_w, num_slots, 1]`
    pub objectness: Tensor,
    /// `[batch]` number of written records per image, `Int64`
    pub num_written: Tensor,
}

/// Batched YOLO targets.
#[derive(Debug)]
pub struct YoloTargetTensors {
    /// `[batch, max_num_instances, num_anchors]`, -1 for no anchor, `Int64`
    pub best_anchors: Tensor,
    pub best_iou_match: Tensor,
    pub scales: Vec<ScaleTargetTensors>,
}

impl YoloTargetTensors {
    pub fn from_targets(targets: &[YoloTarget], precision: Precision, device: Device) -> Result<Self> {
        let kind = precision_kind(precision);
        ensure!(!targets.is_empty(), "cannot batch an empty list of targets");

        let num_scales = targets[0].scales.len();
        ensure!(
            targets.iter().all(|target| target.scales.len() == num_scales),
            "the number of scales differs across the batch"
        );

        let scales: Vec<_> = (0..num_scales)
            .map(|index| {
                let scale_targets: Vec<&ScaleTarget> =
                    targets.iter().map(|target| &target.scales[index]).collect();
                let level = scale_targets[0].level;
                ensure!(
                    scale_targets.iter().all(|scale| scale.level == level),
                    "scale {} has different levels across the batch",
                    index
                );
                let num_written: Vec<i64> = scale_targets
                    .iter()
                    .map(|scale| scale.num_written as i64)
                    .collect();
                let num_dropped: usize = scale_targets.iter().map(|scale| scale.num_dropped).sum();
                if num_dropped > 0 {
                    warn!(
                        "{} assignments on level {} were dropped in this batch",
                        num_dropped, level
                    );
                }

                Ok(ScaleTargetTensors {
                    level,
                    indices: stack_arrays(
                        "indices",
                        scale_targets.iter().map(|s| &s.indices),
                        Kind::Int64,
                        device,
                    )?,
                    records: stack_arrays("records", scale_targets.iter().map(|s| &s.records), kind, device)?,
                    grid: stack_arrays("grid", scale_targets.iter().map(|s| &s.grid), kind, device)?,
                    objectness: stack_arrays(
                        "objectness",
                        scale_targets.iter().map(|s| &s.objectness),
                        kind,
                        device,
                    )?,
                    num_written: Tensor::of_slice(&num_written).to_device(device),
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            best_anchors: stack_arrays(
                "best_anchors",
                targets.iter().map(|t| &t.best_anchors),
                Kind::Int64,
                device,
            )?,
            best_iou_match: stack_arrays(
                "best_iou_match",
                targets.iter().map(|t| &t.best_iou_match),
                kind,
                device,
            )?,
            scales,
        })
    }
}
