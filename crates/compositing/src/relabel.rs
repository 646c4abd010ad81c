//! Deterministic band relabeling for existing stacks
//!
//! Rewrites the band descriptions of a previously exported stack by
//! position: bands are assumed to be in builder enumeration order
//! (years ascending, season months ascending), so band `i` belongs to
//! year `start_year + i / season.len()` at season index
//! `i % season.len() + 1`.

use seasonwatch_core::{Error, MultibandRaster, Result};

use crate::season::{BandLabel, SeasonWindow};

/// Assign `{prefix}_{year}_{index}` labels to every band by position.
///
/// The band count must be a whole number of seasons; otherwise the stack
/// cannot have come from the builder's enumeration and relabeling would
/// silently mislabel trailing bands.
pub fn relabel_stack(
    stack: &mut MultibandRaster<f64>,
    prefix: &str,
    start_year: i32,
    season: &SeasonWindow,
) -> Result<()> {
    let per_year = season.len();
    let count = stack.band_count();
    if count % per_year != 0 {
        return Err(Error::InvalidRange {
            what: "band_count",
            value: count.to_string(),
            bounds: format!("a multiple of the season length {}", per_year),
        });
    }

    let labels = (0..count)
        .map(|i| {
            let year = start_year + (i / per_year) as i32;
            let index = (i % per_year) as u32 + 1;
            BandLabel::new(prefix, year, index).to_string()
        })
        .collect();

    stack.set_labels(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seasonwatch_core::{MultibandRaster, Raster};

    fn unlabeled_stack(bands: usize) -> MultibandRaster<f64> {
        let mut stack =
            MultibandRaster::from_band(Raster::filled(1, 1, 0.0), "band_1");
        for i in 1..bands {
            stack
                .push_band(Raster::filled(1, 1, i as f64), format!("band_{}", i + 1))
                .unwrap();
        }
        stack
    }

    #[test]
    fn test_relabel_two_years() {
        let mut stack = unlabeled_stack(4);
        let season = SeasonWindow::new(3, 4).unwrap();

        relabel_stack(&mut stack, "NDVI", 2000, &season).unwrap();
        assert_eq!(
            stack.labels(),
            &[
                "NDVI_2000_1".to_string(),
                "NDVI_2000_2".to_string(),
                "NDVI_2001_1".to_string(),
                "NDVI_2001_2".to_string(),
            ]
        );
    }

    #[test]
    fn test_partial_season_rejected() {
        let mut stack = unlabeled_stack(5);
        let season = SeasonWindow::new(3, 4).unwrap();
        assert!(matches!(
            relabel_stack(&mut stack, "NDVI", 2000, &season),
            Err(Error::InvalidRange { .. })
        ));
    }
}
