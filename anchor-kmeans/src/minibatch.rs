//! Streaming k-means over batches of box sizes.
//!
//! Box sizes are summed per cluster over `mean_steps` batches before the
//! centroids are updated. At the end of each epoch, the next epoch starts
//! from the mean of the centroids produced within the epoch.

use crate::{
    common::*,
    kmeans::{nearest_centroid, sort_by_area},
};

#[derive(Debug, Clone)]
pub struct MiniBatchKMeansInit {
    pub k: usize,
    /// The number of batches accumulated per centroid update.
    pub mean_steps: usize,
    pub epochs: usize,
    pub seed: Option<u64>,
}

impl MiniBatchKMeansInit {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            mean_steps: 2000,
            epochs: 10,
            seed: None,
        }
    }

    pub fn build(self) -> Result<MiniBatchKMeans> {
        let Self {
            k,
            mean_steps,
            epochs,
            seed,
        } = self;
        ensure!(k > 0, "k must be positive");
        ensure!(mean_steps > 0, "mean_steps must be positive");
        ensure!(epochs > 0, "epochs must be positive");

        Ok(MiniBatchKMeans {
            k,
            mean_steps,
            epochs,
            seed,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MiniBatchKMeans {
    k: usize,
    mean_steps: usize,
    epochs: usize,
    seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatchResult {
    /// Cluster centroids sorted by ascending area.
    pub centroids: Vec<HW<f64>>,
    pub num_updates: usize,
    pub num_epochs: usize,
    pub cancelled: bool,
}

/// Per-cluster size sums between two centroid updates.
#[derive(Debug, Clone)]
struct Accumulator {
    sums: Vec<[f64; 2]>,
    counts: Vec<usize>,
}

impl Accumulator {
    fn new(k: usize) -> Self {
        Self {
            sums: vec![[0.0; 2]; k],
            counts: vec![0; k],
        }
    }

    fn add_batch(&mut self, centroids: &[HW<f64>], batch: &[HW<f64>]) {
        let clusters: Vec<usize> = batch
            .par_iter()
            .map(|size| nearest_centroid(centroids, size))
            .collect();
        batch.iter().zip(clusters).for_each(|(size, cluster)| {
            self.sums[cluster][0] += size.h();
            self.sums[cluster][1] += size.w();
            self.counts[cluster] += 1;
        });
    }

    /// Average the sums into new centroids and reset. Empty clusters keep
    /// their previous centroid.
    fn take_centroids(&mut self, previous: &[HW<f64>]) -> Vec<HW<f64>> {
        let centroids = previous
            .iter()
            .zip(self.sums.iter().zip(&self.counts))
            .map(|(prev, (&[sum_h, sum_w], &count))| {
                if count == 0 {
                    *prev
                } else {
                    let count = count as f64;
                    HW::from_hw([sum_h / count, sum_w / count])
                }
            })
            .collect();
        *self = Self::new(previous.len());
        centroids
    }
}

impl MiniBatchKMeans {
    pub fn fit<F, I>(&self, batches: F) -> Result<MiniBatchResult>
    where
        F: FnMut(usize) -> Result<I>,
        I: IntoIterator<Item = Vec<HW<f64>>>,
    {
        self.fit_with_cancel(batches, &AtomicBool::new(false))
    }

    /// Cluster the batches produced by `batches(epoch)` for each epoch.
    ///
    /// The box sizes are expected to be normalized to the image size since
    /// the centroids are initialized uniformly in `[0, 1)`. Cancellation is
    /// checked before every batch and returns the latest centroids.
    pub fn fit_with_cancel<F, I>(&self, mut batches: F, cancel: &AtomicBool) -> Result<MiniBatchResult>
    where
        F: FnMut(usize) -> Result<I>,
        I: IntoIterator<Item = Vec<HW<f64>>>,
    {
        let Self {
            k,
            mean_steps,
            epochs,
            seed,
        } = *self;

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut mean_centroids: Vec<_> = (0..k)
            .map(|_| HW::from_hw([rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)]))
            .collect();
        let mut centroids = mean_centroids.clone();
        let mut accumulator = Accumulator::new(k);
        let mut num_updates = 0;
        let mut num_epochs = 0;
        let mut cancelled = false;

        'epoch: for epoch in 0..epochs {
            centroids = mean_centroids.clone();
            let mut epoch_sums: Vec<[f64; 2]> = mean_centroids.iter().map(|c| [c.h(), c.w()]).collect();
            let mut epoch_count = 1usize;
            let mut steps = 0;

            for (index, batch) in batches(epoch)
                .with_context(|| format!("failed to load batches of epoch {}", epoch))?
                .into_iter()
                .enumerate()
            {
                if cancel.load(Ordering::SeqCst) {
                    info!("mini-batch k-means cancelled at epoch {} batch {}", epoch, index);
                    cancelled = true;
                    break 'epoch;
                }

                accumulator.add_batch(&centroids, &batch);
                steps += 1;

                if steps == mean_steps {
                    steps = 0;
                    centroids = accumulator.take_centroids(&centroids);
                    centroids.iter().zip(&mut epoch_sums).for_each(|(c, sum)| {
                        sum[0] += c.h();
                        sum[1] += c.w();
                    });
                    epoch_count += 1;
                    num_updates += 1;
                    debug!("epoch {} batch {}: centroids updated", epoch, index);
                }
            }

            let count = epoch_count as f64;
            mean_centroids = epoch_sums
                .iter()
                .map(|&[sum_h, sum_w]| HW::from_hw([sum_h / count, sum_w / count]))
                .collect();
            num_epochs += 1;
            info!("epoch {} finished after {} centroid updates", epoch, epoch_count - 1);
        }

        if num_updates == 0 {
            warn!(
                "no centroid update happened, fewer than {} batches were given per epoch",
                mean_steps
            );
        }

        sort_by_area(&mut centroids);
        Ok(MiniBatchResult {
            centroids,
            num_updates,
            num_epochs,
            cancelled,
        })
    }
}
