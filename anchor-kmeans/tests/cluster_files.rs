use anchor_kmeans::{load_sizes, BoxFormat, KMeansInit, MiniBatchKMeansInit};
use anyhow::Result;
use approx::assert_abs_diff_eq;
use bbox::HW;
use std::path::PathBuf;

fn write_temp(name: &str, text: &str) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("anchor-kmeans-{}-{}", std::process::id(), name));
    std::fs::write(&path, text)?;
    Ok(path)
}

#[test]
fn corner_file_to_anchors() -> Result<()> {
    // three shapes, each repeated, given as corners at different positions
    let mut text = String::from("ymin,xmin,ymax,xmax\n");
    for offset in 0..4 {
        let offset = offset as f64 * 0.125;
        text += &format!("{},{},{},{}\n", offset, offset, offset + 0.0625, offset + 0.03125);
        text += &format!("{},{},{},{}\n", offset, 0.5, offset + 0.25, 0.625);
        text += &format!("{},{},{},{}\n", 0.0, offset, 0.5, offset + 0.5);
    }
    let path = write_temp("corners.csv", &text)?;
    let sizes = load_sizes(&path, BoxFormat::Yxyx)?;
    std::fs::remove_file(&path)?;
    assert_eq!(sizes.len(), 12);

    let result = KMeansInit {
        seed: Some(42),
        ..KMeansInit::new(3)
    }
    .build()?
    .fit(&sizes)?;

    assert_eq!(result.num_iters, 1);
    let expected = [[0.03125, 0.0625], [0.125, 0.25], [0.5, 0.5]];
    for (centroid, [w, h]) in result.centroids.iter().zip(expected) {
        assert_abs_diff_eq!(centroid.w(), w, epsilon = 1e-9);
        assert_abs_diff_eq!(centroid.h(), h, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(result.mean_iou(&sizes), 1.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn separated_clusters() -> Result<()> {
    let small = HW::from_hw([0.04, 0.03]);
    let large = HW::from_hw([0.6, 0.5]);
    let sizes: Vec<_> = (0..200)
        .map(|index| if index % 2 == 0 { small } else { large })
        .collect();

    let batch = KMeansInit {
        seed: Some(1),
        ..KMeansInit::new(2)
    }
    .build()?
    .fit(&sizes)?;
    for (centroid, expected) in batch.centroids.iter().zip([small, large]) {
        assert_abs_diff_eq!(centroid.h(), expected.h(), epsilon = 1e-9);
        assert_abs_diff_eq!(centroid.w(), expected.w(), epsilon = 1e-9);
    }

    // a single streaming cluster settles on the mean size
    let mini = MiniBatchKMeansInit {
        k: 1,
        mean_steps: 5,
        epochs: 2,
        seed: Some(1),
    }
    .build()?
    .fit(|_| Ok(sizes.chunks(10).map(|chunk| chunk.to_vec())))?;
    assert_eq!(mini.num_updates, 8);
    assert_abs_diff_eq!(mini.centroids[0].h(), 0.32, epsilon = 1e-9);
    assert_abs_diff_eq!(mini.centroids[0].w(), 0.265, epsilon = 1e-9);
    Ok(())
}

#[test]
fn missing_file_is_an_error() {
    assert!(load_sizes("/nonexistent/anchor-kmeans.csv", BoxFormat::Wh).is_err());
}
