//! Box size loading from CSV label files.

use crate::common::*;

/// The column layout of a box CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
pub enum BoxFormat {
    /// `w,h` columns.
    #[strum(serialize = "wh")]
    Wh,
    /// `ymin,xmin,ymax,xmax` corner columns.
    #[strum(serialize = "yxyx")]
    Yxyx,
}

#[derive(Debug, Clone, Deserialize)]
struct WhRecord {
    w: f64,
    h: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct YxyxRecord {
    ymin: f64,
    xmin: f64,
    ymax: f64,
    xmax: f64,
}

/// Load box sizes from a CSV file with a header row.
pub fn load_sizes(path: impl AsRef<Path>, format: BoxFormat) -> Result<Vec<HW<f64>>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open '{}'", path.display()))?;
    read_sizes(file, format).with_context(|| format!("failed to parse '{}'", path.display()))
}

/// Read box sizes from CSV text with a header row. Lines starting with `#`
/// are comments. Boxes with zero width or height are skipped.
pub fn read_sizes<R>(reader: R, format: BoxFormat) -> Result<Vec<HW<f64>>>
where
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let wh_pairs: Vec<[f64; 2]> = match format {
        BoxFormat::Wh => reader
            .deserialize::<WhRecord>()
            .map_ok(|WhRecord { w, h }| [w, h])
            .try_collect()?,
        BoxFormat::Yxyx => reader
            .deserialize::<YxyxRecord>()
            .map_ok(
                |YxyxRecord {
                     ymin,
                     xmin,
                     ymax,
                     xmax,
                 }| [xmax - xmin, ymax - ymin],
            )
            .try_collect()?,
    };

    let num_records = wh_pairs.len();
    let sizes: Vec<_> = wh_pairs
        .into_iter()
        .enumerate()
        .map(|(index, [w, h])| {
            ensure!(
                w.is_finite() && h.is_finite(),
                "record {} has a non-finite size ({}, {})",
                index,
                w,
                h
            );
            HW::try_from_wh([w, h]).with_context(|| format!("record {} is inverted", index))
        })
        .filter_ok(|size| size.h() > 0.0 && size.w() > 0.0)
        .try_collect()?;

    if sizes.len() < num_records {
        warn!(
            "{} degenerate boxes out of {} are skipped",
            num_records - sizes.len(),
            num_records
        );
    }

    Ok(sizes)
}
