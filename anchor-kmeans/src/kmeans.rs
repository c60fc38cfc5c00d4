use crate::common::*;

/// IoU of two box sizes placed at the origin.
pub fn shape_iou(lhs: &HW<f64>, rhs: &HW<f64>) -> f64 {
    bbox::overlap(
        &lhs.to_cycxhw_at_origin(),
        &rhs.to_cycxhw_at_origin(),
        BoxMetric::IoU,
    )
}

/// The index of the centroid closest to `size`. Ties go to the lower index.
pub(crate) fn nearest_centroid(centroids: &[HW<f64>], size: &HW<f64>) -> usize {
    centroids
        .iter()
        .map(|centroid| 1.0 - shape_iou(size, centroid))
        .position_min_by(|lhs, rhs| lhs.partial_cmp(rhs).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0)
}

/// Sort centroids by ascending area, returning the old index of each sorted entry.
pub(crate) fn sort_by_area(centroids: &mut Vec<HW<f64>>) -> Vec<usize> {
    let order: Vec<usize> = (0..centroids.len())
        .sorted_by(|&lhs, &rhs| {
            centroids[lhs]
                .area()
                .partial_cmp(&centroids[rhs].area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .collect();
    *centroids = order.iter().map(|&index| centroids[index]).collect();
    order
}

#[derive(Debug, Clone)]
pub struct KMeansInit {
    pub k: usize,
    pub max_iter: usize,
    /// Seed of the centroid initialization. A random seed is drawn if unset.
    pub seed: Option<u64>,
}

impl KMeansInit {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            seed: None,
        }
    }

    pub fn build(self) -> Result<KMeans> {
        let Self { k, max_iter, seed } = self;
        ensure!(k > 0, "k must be positive");
        ensure!(max_iter > 0, "max_iter must be positive");
        Ok(KMeans { k, max_iter, seed })
    }
}

/// Lloyd's k-means with `1 - IoU` distance.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iter: usize,
    seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster centroids sorted by ascending area.
    pub centroids: Vec<HW<f64>>,
    /// The index into `centroids` of the cluster of each input size.
    pub assignments: Vec<usize>,
    /// The number of centroid updates performed.
    pub num_iters: usize,
    /// False if stopped by `max_iter` or by cancellation.
    pub converged: bool,
}

impl KMeansResult {
    /// The mean IoU between each input size and its centroid.
    pub fn mean_iou(&self, sizes: &[HW<f64>]) -> f64 {
        if sizes.is_empty() {
            return 0.0;
        }
        let total: f64 = sizes
            .iter()
            .zip(&self.assignments)
            .map(|(size, &cluster)| shape_iou(size, &self.centroids[cluster]))
            .sum();
        total / sizes.len() as f64
    }
}

impl KMeans {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn fit(&self, sizes: &[HW<f64>]) -> Result<KMeansResult> {
        self.fit_with_cancel(sizes, &AtomicBool::new(false))
    }

    /// Cluster `sizes`, checking `cancel` before every iteration.
    ///
    /// A cancelled run returns the centroids of the last completed iteration.
    pub fn fit_with_cancel(&self, sizes: &[HW<f64>], cancel: &AtomicBool) -> Result<KMeansResult> {
        let k = self.k;
        ensure!(!sizes.is_empty(), "no box sizes to cluster");
        ensure!(
            sizes.iter().all(|size| size.h().is_finite() && size.w().is_finite()),
            "box sizes must be finite"
        );

        let distinct: Vec<_> = sizes
            .iter()
            .cloned()
            .sorted_by(|lhs, rhs| {
                (lhs.h(), lhs.w())
                    .partial_cmp(&(rhs.h(), rhs.w()))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .dedup()
            .collect();
        ensure!(
            distinct.len() >= k,
            "expect at least {} distinct box sizes, but get {}",
            k,
            distinct.len()
        );

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut centroids: Vec<_> = distinct.choose_multiple(&mut rng, k).cloned().collect();

        let mut last: Option<Vec<usize>> = None;
        let mut num_iters = 0;
        let mut converged = false;

        while num_iters < self.max_iter {
            if cancel.load(Ordering::SeqCst) {
                info!("k-means cancelled after {} iterations", num_iters);
                break;
            }

            let curr: Vec<usize> = sizes
                .par_iter()
                .map(|size| nearest_centroid(&centroids, size))
                .collect();
            if last.as_ref() == Some(&curr) {
                converged = true;
                break;
            }

            let mut sums = vec![[0f64; 2]; k];
            let mut counts = vec![0usize; k];
            sizes.iter().zip(&curr).for_each(|(size, &cluster)| {
                sums[cluster][0] += size.h();
                sums[cluster][1] += size.w();
                counts[cluster] += 1;
            });
            centroids
                .iter_mut()
                .zip(sums.iter().zip(&counts))
                .filter(|(_, (_, &count))| count > 0)
                .for_each(|(centroid, (&[sum_h, sum_w], &count))| {
                    let count = count as f64;
                    *centroid = HW::from_hw([sum_h / count, sum_w / count]);
                });

            last = Some(curr);
            num_iters += 1;
            debug!("k-means iteration {}", num_iters);
        }

        if !converged && !cancel.load(Ordering::SeqCst) {
            warn!(
                "k-means does not converge within {} iterations",
                self.max_iter
            );
        }
        info!("num_iters = {}", num_iters);

        let assignments: Vec<usize> = sizes
            .par_iter()
            .map(|size| nearest_centroid(&centroids, size))
            .collect();

        let order = sort_by_area(&mut centroids);
        let mut rank = vec![0; k];
        order
            .iter()
            .enumerate()
            .for_each(|(new, &old)| rank[old] = new);
        let assignments = assignments.into_iter().map(|cluster| rank[cluster]).collect();

        Ok(KMeansResult {
            centroids,
            assignments,
            num_iters,
            converged,
        })
    }
}
