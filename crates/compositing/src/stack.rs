//! Band renaming and stacking
//!
//! Concatenates monthly composites into one multi-band raster with
//! deterministic `{prefix}_{year}_{season_index}` band labels. Each
//! composite contributes exactly one band, so label uniqueness follows
//! from the builder's (year, month) enumeration.

use seasonwatch_core::{Error, MultibandRaster, Result};
use tracing::debug;

use crate::composite::Composite;
use crate::season::{BandLabel, SeasonWindow};

/// Stack composites in order into a labeled multi-band raster.
///
/// The first composite seeds the stack; every subsequent composite's band
/// is appended in enumeration order. Fails with `EmptyInput` when there is
/// no first composite to seed from, and with `SizeMismatch` when a
/// composite disagrees with the stack shape, and with `Other` when its
/// georeferencing disagrees with the seed band's.
pub fn stack_composites(
    composites: &[Composite],
    prefix: &str,
    season: &SeasonWindow,
) -> Result<MultibandRaster<f64>> {
    let mut iter = composites.iter();
    let first = iter
        .next()
        .ok_or(Error::EmptyInput("no composites to stack"))?;

    let label = BandLabel::for_month(prefix, first.year, first.month, season)?;
    let mut stack = MultibandRaster::from_band(first.raster.clone(), label.to_string());

    for composite in iter {
        if composite.raster.transform() != stack.transform() {
            return Err(Error::Other(format!(
                "composite {}-{} georeferencing differs from the stack",
                composite.year, composite.month
            )));
        }
        let label = BandLabel::for_month(prefix, composite.year, composite.month, season)?;
        stack.push_band(composite.raster.clone(), label.to_string())?;
    }

    debug!(bands = stack.band_count(), prefix, "stacked composites");
    Ok(stack)
}
