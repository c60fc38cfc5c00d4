use anyhow::Result;
use bbox::TLBR_;
use label::{Instance, InstanceSet};
use yolo_target::{Config, YoloTargetEncoder};

const IMAGE_SIZE: f32 = 416.0;

/// An instance given in pixels, normalized by the image size.
fn pixel_instance(cx: f32, cy: f32, w: f32, h: f32, class: i64) -> Instance<f32> {
    let tlbr = [cy - h / 2.0, cx - w / 2.0, cy + h / 2.0, cx + w / 2.0].map(|v| v / IMAGE_SIZE);
    Instance::new(TLBR_::from_tlbr(tlbr), class)
}

fn default_encoder() -> Result<YoloTargetEncoder> {
    Config::default().encoder_init().build()
}

#[test]
fn single_instance_lands_on_one_scale() -> Result<()> {
    let encoder = default_encoder()?;
    // matches the 12x16 prior, no prior of another scale clears the threshold
    let instances =
        InstanceSet::from_instances(vec![pixel_instance(205.0, 100.0, 12.0, 16.0, 5)], 200);
    let target = encoder.encode(&instances);

    assert_eq!(target.best_anchors[[0, 0]], 0);
    assert_eq!(target.scales.len(), 3);

    let fine = &target.scales[0];
    let nonzero: Vec<_> = fine
        .objectness
        .indexed_iter()
        .filter(|(_, value)| **value != 0.0)
        .map(|(index, _)| index)
        .collect();
    assert_eq!(nonzero, vec![(12, 25, 0, 0)]);

    for scale in &target.scales[1..] {
        assert!(scale.objectness.iter().all(|&value| value == 0.0));
        assert_eq!(scale.num_written, 0);
    }
    Ok(())
}

#[test]
fn class_ids_start_from_one() -> Result<()> {
    let encoder = default_encoder()?;
    let instances = InstanceSet::from_instances(
        vec![
            pixel_instance(205.0, 100.0, 12.0, 16.0, 80),
            pixel_instance(105.0, 300.0, 12.0, 16.0, 1),
            pixel_instance(305.0, 300.0, 12.0, 16.0, 0),
        ],
        200,
    );
    let target = encoder.encode(&instances);

    // the last class is kept and class 0 lies below the first id
    let fine = &target.scales[0];
    assert_eq!(fine.num_written, 2);
    assert_eq!(fine.records[[0, 5]], 79.0);
    assert_eq!(fine.records[[1, 5]], 0.0);
    assert_eq!(target.best_anchors[[2, 0]], -1);

    let zero_based = Config {
        class_id_offset: 0,
        ..Config::default()
    }
    .encoder_init()
    .build()?
    .encode(&instances);
    assert_eq!(zero_based.scales[0].num_written, 2);
    assert_eq!(zero_based.scales[0].records[[0, 5]], 1.0);
    assert_eq!(zero_based.scales[0].records[[1, 5]], 0.0);
    Ok(())
}

#[test]
fn tie_breaker_adds_alternate_scales() -> Result<()> {
    // the 142x110 prior is the best, the 72x146 and 76x55 priors of level 4 also clear 0.2
    let instances =
        InstanceSet::from_instances(vec![pixel_instance(200.0, 200.0, 142.0, 110.0, 1)], 200);

    let with = default_encoder()?.encode(&instances);
    let written: Vec<_> = with.scales.iter().map(|scale| scale.num_written).collect();
    assert_eq!(written, vec![0, 2, 1]);
    assert_eq!(with.scales[1].indices.row(0).to_vec(), vec![12, 12, 2]);
    assert_eq!(with.scales[1].indices.row(1).to_vec(), vec![12, 12, 1]);
    assert_eq!(with.scales[1].records[[0, 7]], 2.0);

    let without = Config {
        use_tie_breaker: false,
        ..Config::default()
    }
    .encoder_init()
    .build()?
    .encode(&instances);
    let written: Vec<_> = without.scales.iter().map(|scale| scale.num_written).collect();
    assert_eq!(written, vec![0, 0, 1]);
    Ok(())
}

#[test]
fn batch_encoding_matches_single_images() -> Result<()> {
    let encoder = Config {
        max_num_instances: 4,
        ..Config::default()
    }
    .encoder_init()
    .build()?;

    let instances = InstanceSet::from_instances(
        (0..4).map(|index| pixel_instance(20.0 + 40.0 * index as f32, 20.0, 12.0, 16.0, 1)),
        4,
    );
    let mut many = vec![instances.clone(); 3];
    many.push(InstanceSet::from_instances(Vec::new(), 4));

    let batch = encoder.encode_batch(&many);
    assert_eq!(batch.len(), 4);
    assert_eq!(batch[0], batch[1]);

    let fine = &batch[0].scales[0];
    assert_eq!(fine.num_written, 4);
    assert_eq!(fine.indices.shape(), &[4, 3]);
    // each instance has one alternate on the same scale, which is not written
    assert_eq!(fine.num_dropped, 0);

    let empty = &batch[3];
    assert!(empty.scales.iter().all(|scale| scale.num_written == 0));
    assert!(empty.best_anchors.iter().all(|&anchor| anchor == -1));
    Ok(())
}

#[test]
fn alternates_beyond_capacity_are_dropped() -> Result<()> {
    let encoder = Config {
        max_num_instances: 2,
        ..Config::default()
    }
    .encoder_init()
    .build()?;

    // each instance writes a primary on level 5 and two alternates on level 4
    let instances = InstanceSet::from_instances(
        vec![
            pixel_instance(100.0, 100.0, 142.0, 110.0, 1),
            pixel_instance(300.0, 300.0, 142.0, 110.0, 1),
        ],
        2,
    );
    let target = encoder.encode(&instances);

    let level4 = &target.scales[1];
    assert_eq!(level4.num_written, 2);
    assert_eq!(level4.num_dropped, 2);
    assert!(level4.indices.column(0).iter().all(|&row| row == 6));

    let level5 = &target.scales[2];
    assert_eq!(level5.num_written, 2);
    assert_eq!(level5.num_dropped, 0);
    Ok(())
}

#[test]
fn config_file_round_trip() -> Result<()> {
    let path = std::env::temp_dir().join(format!("yolo-target-{}.json5", std::process::id()));
    std::fs::write(
        &path,
        r#"{
            // two scales over a 256x256 image
            image_w: 256,
            image_h: 256,
            anchors: [[16, 16], [32, 32], [64, 64], [128, 128]],
            scales: [
                { level: 4, mask: [0, 1] },
                { level: 5, mask: [2, 3] },
            ],
        }"#,
    )?;
    let config = Config::open(&path)?;
    std::fs::remove_file(&path)?;

    let encoder = config.encoder_init().build()?;
    let grids: Vec<_> = encoder
        .layout()
        .scales()
        .iter()
        .map(|scale| (scale.grid_h, scale.num_slots()))
        .collect();
    assert_eq!(grids, vec![(16, 2), (8, 2)]);
    assert!(Config::open(std::env::temp_dir().join("yolo-target-missing.json5")).is_err());
    Ok(())
}
