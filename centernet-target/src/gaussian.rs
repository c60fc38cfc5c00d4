//! Gaussian radius derivation and splatting.

use crate::common::*;

/// The largest radius such that a box displaced by the radius still
/// overlaps the original box with at least `min_overlap` IoU.
///
/// The three quadratic roots correspond to both corners shifted inward,
/// both outward, and one inward one outward. The minimum finite root is
/// taken, floored and clamped to be non-negative.
pub fn gaussian_radius(height: f64, width: f64, min_overlap: f64) -> f64 {
    let (h, w, o) = (height, width, min_overlap);

    let a1 = 1.0;
    let b1 = h + w;
    let c1 = w * h * (1.0 - o) / (1.0 + o);
    let r1 = (b1 + (b1.powi(2) - 4.0 * a1 * c1).sqrt()) / 2.0;

    let a2 = 4.0;
    let b2 = 2.0 * (h + w);
    let c2 = (1.0 - o) * w * h;
    let r2 = (b2 + (b2.powi(2) - 4.0 * a2 * c2).sqrt()) / 2.0;

    let a3 = 4.0 * o;
    let b3 = -2.0 * o * (h + w);
    let c3 = (o - 1.0) * w * h;
    let r3 = (b3 + (b3.powi(2) - 4.0 * a3 * c3).sqrt()) / 2.0;

    let radius = [r1, r2, r3]
        .into_iter()
        .filter(|root| root.is_finite())
        .reduce(f64::min)
        .unwrap_or(0.0);

    radius.floor().max(0.0)
}

/// A Gaussian peak to be added onto a `[height, width]` heatmap channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSplat {
    pub cy: isize,
    pub cx: isize,
    pub radius: usize,
    /// Multiplier on the standard deviation `diameter / 6`.
    pub spread: f64,
}

impl GaussianSplat {
    pub fn sigma(&self) -> f64 {
        let diameter = (2 * self.radius + 1) as f64;
        diameter / 6.0 * self.spread
    }

    /// Add the Gaussian onto the heatmap channel. The kernel window is
    /// clipped to the channel and overlapping peaks accumulate.
    pub fn draw(&self, mut channel: ArrayViewMut2<'_, f32>) {
        let (height, width) = channel.dim();
        let radius = self.radius as isize;
        let denom = 2.0 * self.sigma().powi(2);

        let top = (self.cy - radius).max(0);
        let bottom = (self.cy + radius + 1).min(height as isize);
        let left = (self.cx - radius).max(0);
        let right = (self.cx + radius + 1).min(width as isize);

        if top >= bottom || left >= right {
            return;
        }

        for row in top..bottom {
            for col in left..right {
                let dy = (row - self.cy) as f64;
                let dx = (col - self.cx) as f64;
                let value = (-(dy * dy + dx * dx) / denom).exp();
                channel[[row as usize, col as usize]] += value as f32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn radius_of_full_output_box() {
        // a 512x512 box on a 128x128 output grid
        assert_abs_diff_eq!(gaussian_radius(128.0, 128.0, 0.7), 34.0);
    }

    #[test]
    fn radius_of_degenerate_boxes() {
        assert_abs_diff_eq!(gaussian_radius(0.0, 0.0, 0.7), 0.0);
        assert_abs_diff_eq!(gaussian_radius(1.0, 1.0, 0.7), 0.0);
        // an inverted box yields a NaN root which is ignored
        assert_abs_diff_eq!(gaussian_radius(-46.0, 18.0, 0.7), 4.0);
    }

    #[test]
    fn radius_grows_with_box_size() {
        let small = gaussian_radius(10.0, 10.0, 0.7);
        let large = gaussian_radius(40.0, 40.0, 0.7);
        assert!(small <= large);
        assert!(gaussian_radius(40.0, 40.0, 0.9) <= large);
    }

    #[test]
    fn splat_peak_and_symmetry() {
        let mut heatmap = Array2::<f32>::zeros((9, 9));
        let splat = GaussianSplat {
            cy: 4,
            cx: 4,
            radius: 2,
            spread: 1.0,
        };
        splat.draw(heatmap.view_mut());

        assert_abs_diff_eq!(heatmap[[4, 4]], 1.0);
        assert_abs_diff_eq!(heatmap[[4, 3]], heatmap[[4, 5]]);
        assert_abs_diff_eq!(heatmap[[3, 4]], heatmap[[5, 4]]);
        assert!(heatmap[[4, 3]] < 1.0);
        assert_eq!(heatmap[[4, 1]], 0.0);
        assert_eq!(heatmap.iter().filter(|&&value| value > 0.0).count(), 25);
    }

    #[test]
    fn splat_is_clipped_and_additive() {
        let mut heatmap = Array2::<f32>::zeros((4, 4));
        let splat = GaussianSplat {
            cy: 0,
            cx: 0,
            radius: 3,
            spread: 1.0,
        };
        splat.draw(heatmap.view_mut());
        splat.draw(heatmap.view_mut());
        assert_abs_diff_eq!(heatmap[[0, 0]], 2.0);

        let outside = GaussianSplat {
            cy: -10,
            cx: 2,
            radius: 1,
            spread: 1.0,
        };
        let before = heatmap.clone();
        outside.draw(heatmap.view_mut());
        assert_eq!(heatmap, before);
    }

    #[test]
    fn wider_spread_raises_the_tails() {
        let draw = |spread| {
            let mut heatmap = Array2::<f32>::zeros((7, 7));
            GaussianSplat {
                cy: 3,
                cx: 3,
                radius: 3,
                spread,
            }
            .draw(heatmap.view_mut());
            heatmap
        };
        let narrow = draw(1.0);
        let wide = draw(5.0);
        assert!(wide[[3, 0]] > narrow[[3, 0]]);
        assert_abs_diff_eq!(wide[[3, 3]], narrow[[3, 3]]);
    }
}
