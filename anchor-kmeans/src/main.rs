use anchor_kmeans::{load_sizes, BoxFormat, KMeansInit, MiniBatchKMeansInit};
use anyhow::{Context, Result};
use bbox::HW;
use prettytable::{cell, row, Table};
use serde::Serialize;
use std::{fs::File, io::BufWriter, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Derive anchor priors from box sizes normalized to the image size.
enum Opts {
    /// Run Lloyd's k-means over all box sizes.
    Kmeans {
        /// CSV file of box sizes
        input_file: PathBuf,
        #[structopt(long, default_value = "wh")]
        format: BoxFormat,
        #[structopt(short, long, default_value = "9")]
        k: usize,
        #[structopt(long, default_value = "300")]
        max_iter: usize,
        #[structopt(long)]
        seed: Option<u64>,
        /// the input size of the model the anchors are scaled to
        #[structopt(long, default_value = "416")]
        input_size: f64,
        /// write the anchors to a JSON file
        #[structopt(short, long)]
        output_file: Option<PathBuf>,
    },
    /// Run mini-batch k-means over consecutive chunks of box sizes.
    MiniBatch {
        /// CSV file of box sizes
        input_file: PathBuf,
        #[structopt(long, default_value = "wh")]
        format: BoxFormat,
        #[structopt(short, long, default_value = "9")]
        k: usize,
        #[structopt(long, default_value = "64")]
        batch_size: usize,
        #[structopt(long, default_value = "2000")]
        mean_steps: usize,
        #[structopt(long, default_value = "10")]
        epochs: usize,
        #[structopt(long)]
        seed: Option<u64>,
        #[structopt(long, default_value = "416")]
        input_size: f64,
        #[structopt(short, long)]
        output_file: Option<PathBuf>,
    },
}

/// Anchors in the `(width, height)` pixel layout of the YOLO target config.
#[derive(Debug, Clone, Serialize)]
struct AnchorsOutput {
    anchors: Vec<[f64; 2]>,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Opts::from_args() {
        Opts::Kmeans {
            input_file,
            format,
            k,
            max_iter,
            seed,
            input_size,
            output_file,
        } => {
            let sizes = load_sizes(&input_file, format)?;
            let result = KMeansInit { k, max_iter, seed }.build()?.fit(&sizes)?;
            let counts = (0..k)
                .map(|cluster| {
                    result
                        .assignments
                        .iter()
                        .filter(|&&assigned| assigned == cluster)
                        .count()
                })
                .collect();

            print_anchors(&result.centroids, Some(counts), input_size);
            println!(
                "num_iters = {}, converged = {}, mean IoU = {:.4}",
                result.num_iters,
                result.converged,
                result.mean_iou(&sizes)
            );
            if let Some(output_file) = output_file {
                save_anchors(&result.centroids, input_size, output_file)?;
            }
        }
        Opts::MiniBatch {
            input_file,
            format,
            k,
            batch_size,
            mean_steps,
            epochs,
            seed,
            input_size,
            output_file,
        } => {
            anyhow::ensure!(batch_size > 0, "batch_size must be positive");
            let sizes = load_sizes(&input_file, format)?;
            let result = MiniBatchKMeansInit {
                k,
                mean_steps,
                epochs,
                seed,
            }
            .build()?
            .fit(|_| Ok(sizes.chunks(batch_size).map(|chunk| chunk.to_vec())))?;

            print_anchors(&result.centroids, None, input_size);
            println!(
                "epochs = {}, centroid updates = {}",
                result.num_epochs, result.num_updates
            );
            if let Some(output_file) = output_file {
                save_anchors(&result.centroids, input_size, output_file)?;
            }
        }
    }

    Ok(())
}

fn print_anchors(centroids: &[HW<f64>], counts: Option<Vec<usize>>, input_size: f64) {
    let mut table = Table::new();
    table.add_row(row!["index", "w", "h", "pixel w", "pixel h", "boxes"]);

    centroids.iter().enumerate().for_each(|(index, centroid)| {
        let count = counts
            .as_ref()
            .map(|counts| format!("{}", counts[index]))
            .unwrap_or_else(|| "-".into());
        table.add_row(row![
            index,
            format!("{:.4}", centroid.w()),
            format!("{:.4}", centroid.h()),
            format!("{:.1}", centroid.w() * input_size),
            format!("{:.1}", centroid.h() * input_size),
            count
        ]);
    });

    table.printstd();
}

fn save_anchors(centroids: &[HW<f64>], input_size: f64, output_file: PathBuf) -> Result<()> {
    let output = AnchorsOutput {
        anchors: centroids
            .iter()
            .map(|centroid| {
                [
                    (centroid.w() * input_size).round(),
                    (centroid.h() * input_size).round(),
                ]
            })
            .collect(),
    };
    let writer = BufWriter::new(
        File::create(&output_file)
            .with_context(|| format!("failed to create '{}'", output_file.display()))?,
    );
    serde_json::to_writer_pretty(writer, &output)?;
    Ok(())
}
