//! Deviation (anomaly) computation
//!
//! Given a labeled stack of seasonal bands, aggregate each year's bands
//! into a seasonal mean, average the years before a designated current
//! year into a historical mean, and subtract. All reductions ignore
//! invalid pixels independently per pixel; a pixel with no valid
//! historical observation stays invalid in the output rather than being
//! substituted with a default.

use ndarray::Array2;
use seasonwatch_core::{Error, MultibandRaster, Raster, Result};
use std::collections::BTreeMap;
use tracing::debug;

use crate::maybe_rayon::*;
use crate::season::BandLabel;

/// Per-year seasonal mean rasters from a labeled stack.
///
/// Every band description must parse as `{prefix}_{year}_{index}` with the
/// expected prefix; anything else fails with `Error::BandLabel`. Bands of
/// the same year are averaged per pixel, ignoring invalid observations.
pub fn yearly_seasonal_means(
    stack: &MultibandRaster<f64>,
    prefix: &str,
) -> Result<BTreeMap<i32, Raster<f64>>> {
    let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();

    for (index, label) in stack.labels().iter().enumerate() {
        let parsed = BandLabel::parse(label)?;
        if parsed.prefix != prefix {
            return Err(Error::BandLabel {
                label: label.clone(),
            });
        }
        by_year.entry(parsed.year).or_default().push(index);
    }

    let (rows, cols) = stack.shape();
    let mut means = BTreeMap::new();

    for (year, band_indices) in by_year {
        let mut sum = Array2::<f64>::zeros((rows, cols));
        let mut count = Array2::<u32>::zeros((rows, cols));

        for &index in &band_indices {
            let band = stack.band(index).ok_or(Error::IndexOutOfBounds {
                row: 0,
                col: index,
                rows,
                cols: stack.band_count(),
            })?;
            for ((acc, n), &v) in sum.iter_mut().zip(count.iter_mut()).zip(band.iter()) {
                if !v.is_nan() {
                    *acc += v;
                    *n += 1;
                }
            }
        }

        let data: Vec<f64> = sum
            .iter()
            .zip(count.iter())
            .map(|(&s, &n)| if n == 0 { f64::NAN } else { s / n as f64 })
            .collect();

        let mut raster = stack.to_raster(band_indices[0])?.with_same_meta::<f64>();
        raster.set_nodata(Some(f64::NAN));
        *raster.data_mut() =
            Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

        debug!(year, bands = band_indices.len(), "yearly seasonal mean");
        means.insert(year, raster);
    }

    Ok(means)
}

/// Pixel-wise mean of the years strictly before `current_year`.
///
/// A pixel invalid in every historical year is invalid in the mean.
pub fn historical_mean(
    yearly: &BTreeMap<i32, Raster<f64>>,
    current_year: i32,
) -> Result<Raster<f64>> {
    let historical: Vec<&Raster<f64>> = yearly
        .iter()
        .filter(|(&year, _)| year < current_year)
        .map(|(_, raster)| raster)
        .collect();

    let first = historical
        .first()
        .ok_or(Error::EmptyInput("no historical years before current year"))?;
    let (rows, cols) = first.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = Vec::with_capacity(cols);
            for col in 0..cols {
                let mut sum = 0.0;
                let mut n = 0u32;
                for raster in &historical {
                    let v = raster.data()[(row, col)];
                    if !v.is_nan() {
                        sum += v;
                        n += 1;
                    }
                }
                out.push(if n == 0 { f64::NAN } else { sum / n as f64 });
            }
            out
        })
        .collect();

    let mut raster = first.with_same_meta::<f64>();
    raster.set_nodata(Some(f64::NAN));
    *raster.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(raster)
}

/// Deviation of the current year from the historical seasonal mean.
///
/// `deviation = yearly[current_year] - mean(yearly[year < current_year])`
/// per pixel, invalid wherever either operand is invalid. No
/// minimum-valid-count masking is applied: every pixel with at least one
/// valid historical year contributes.
pub fn deviation_from_historical(
    yearly: &BTreeMap<i32, Raster<f64>>,
    current_year: i32,
) -> Result<Raster<f64>> {
    let current = yearly.get(&current_year).ok_or(Error::InvalidRange {
        what: "current_year",
        value: current_year.to_string(),
        bounds: "a year present in the stack".to_string(),
    })?;

    let historical = historical_mean(yearly, current_year)?;
    let (rows, cols) = current.shape();
    if historical.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: historical.rows(),
            ac: historical.cols(),
        });
    }

    let mut deviation = current.with_same_meta::<f64>();
    deviation.set_nodata(Some(f64::NAN));
    let data: Vec<f64> = current
        .data()
        .iter()
        .zip(historical.data().iter())
        .map(|(&cur, &hist)| cur - hist)
        .collect();
    *deviation.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(deviation)
}
