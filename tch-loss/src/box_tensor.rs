use crate::{common::*, utils::EPSILON};

/// Batched boxes in CyCxHW format, each parameter in shape `[num, 1]`.
#[derive(Debug, Getters)]
pub struct CyCxHWTensor {
    #[get = "pub"]
    cy: Tensor,
    #[get = "pub"]
    cx: Tensor,
    #[get = "pub"]
    h: Tensor,
    #[get = "pub"]
    w: Tensor,
}

impl CyCxHWTensor {
    pub fn from_params(cy: Tensor, cx: Tensor, h: Tensor, w: Tensor) -> Result<Self> {
        let shape = cy.size();
        ensure!(
            cx.size() == shape && h.size() == shape && w.size() == shape,
            "box parameters must have equal shapes"
        );
        ensure!(
            shape.len() == 2 && shape[1] == 1,
            "expect parameter shape [num, 1], but get {:?}",
            shape
        );
        Ok(Self { cy, cx, h, w })
    }

    /// Split a `[num, 4]` tensor in `(x, y, w, h)` layout, as found in grid target records.
    pub fn from_xcycwh(xcycwh: &Tensor) -> Result<Self> {
        let (_, entries) = xcycwh.size2()?;
        ensure!(entries == 4, "expect 4 box parameters, but get {}", entries);
        Self::from_params(
            xcycwh.narrow(1, 1, 1),
            xcycwh.narrow(1, 0, 1),
            xcycwh.narrow(1, 3, 1),
            xcycwh.narrow(1, 2, 1),
        )
    }

    pub fn num_samples(&self) -> i64 {
        self.cy.size()[0]
    }

    pub fn area(&self) -> Tensor {
        &self.h * &self.w
    }

    /// The `[t, l, b, r]` corners.
    fn tlbr(&self) -> [Tensor; 4] {
        let half_h = &self.h / 2.0;
        let half_w = &self.w / 2.0;
        [
            &self.cy - &half_h,
            &self.cx - &half_w,
            &self.cy + &half_h,
            &self.cx + &half_w,
        ]
    }

    pub fn intersect_area_with(&self, other: &Self) -> Tensor {
        let [lt, ll, lb, lr] = self.tlbr();
        let [rt, rl, rb, rr] = other.tlbr();
        let inner_h = (lb.min1(&rb) - lt.max1(&rt)).clamp_min(0.0);
        let inner_w = (lr.min1(&rr) - ll.max1(&rl)).clamp_min(0.0);
        inner_h * inner_w
    }

    /// The `(h, w)` of the smallest box enclosing both boxes.
    pub fn closure_size_with(&self, other: &Self) -> (Tensor, Tensor) {
        let [lt, ll, lb, lr] = self.tlbr();
        let [rt, rl, rb, rr] = other.tlbr();
        let h = lb.max1(&rb) - lt.min1(&rt);
        let w = lr.max1(&rr) - ll.min1(&rl);
        (h, w)
    }

    fn union_area_with(&self, other: &Self, inter_area: &Tensor) -> Tensor {
        self.area() + other.area() - inter_area
    }

    pub fn iou_with(&self, other: &Self) -> Tensor {
        let inter_area = self.intersect_area_with(other);
        let union_area = self.union_area_with(other, &inter_area);
        inter_area / (union_area + EPSILON)
    }

    pub fn giou_with(&self, other: &Self) -> Tensor {
        let inter_area = self.intersect_area_with(other);
        let union_area = self.union_area_with(other, &inter_area);
        let iou = &inter_area / (&union_area + EPSILON);

        let (closure_h, closure_w) = self.closure_size_with(other);
        let closure_area = closure_h * closure_w;
        let giou = iou - (&closure_area - &union_area) / (&closure_area + EPSILON);
        giou.clamp(-1.0, 1.0)
    }

    fn center_penalty_with(&self, other: &Self) -> Tensor {
        let (closure_h, closure_w) = self.closure_size_with(other);
        let diagonal_square = closure_h.pow(2.0) + closure_w.pow(2.0) + EPSILON;
        let center_dist_square = (&self.cy - &other.cy).pow(2.0) + (&self.cx - &other.cx).pow(2.0);
        center_dist_square / diagonal_square
    }

    pub fn diou_with(&self, other: &Self) -> Tensor {
        let diou = self.iou_with(other) - self.center_penalty_with(other);
        diou.clamp(-1.0, 1.0)
    }

    /// The balancing weight of the aspect term is a constant to the gradient.
    pub fn ciou_with(&self, other: &Self) -> Tensor {
        use std::f64::consts::PI;

        let iou = self.iou_with(other);
        let self_angle = self.w.atan2(&self.h);
        let other_angle = other.w.atan2(&other.h);

        let shape_loss = (&self_angle - &other_angle).pow(2.0) * 4.0 / PI.powi(2);
        let shape_loss_coef = tch::no_grad(|| &shape_loss / (1.0 - &iou + &shape_loss + EPSILON));

        let ciou = &iou - self.center_penalty_with(other) - shape_loss_coef * shape_loss;
        ciou.clamp(-1.0, 1.0)
    }

    pub fn metric_with(&self, other: &Self, metric: BoxMetric) -> Tensor {
        match metric {
            BoxMetric::IoU => self.iou_with(other),
            BoxMetric::GIoU => self.giou_with(other),
            BoxMetric::DIoU => self.diou_with(other),
            BoxMetric::CIoU => self.ciou_with(other),
        }
    }
}

impl<'a> FromIterator<&'a bbox::CyCxHW<f64>> for CyCxHWTensor {
    fn from_iter<I: IntoIterator<Item = &'a bbox::CyCxHW<f64>>>(iter: I) -> Self {
        use bbox::Rect as _;

        let (cy, cx, h, w): (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>) = iter
            .into_iter()
            .map(|cycxhw| {
                (
                    cycxhw.cy() as f32,
                    cycxhw.cx() as f32,
                    cycxhw.h() as f32,
                    cycxhw.w() as f32,
                )
            })
            .multiunzip();
        let column = |values: &[f32]| Tensor::of_slice(values).view([-1, 1]);

        Self {
            cy: column(&cy),
            cx: column(&cx),
            h: column(&h),
            w: column(&w),
        }
    }
}
