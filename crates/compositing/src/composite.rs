//! Monthly composite builder
//!
//! Aggregates a capture-time-ordered raster series into one composite per
//! (year, month) pair across a multi-year season window. A month with no
//! matching entries yields an all-invalid composite rather than an error:
//! satellite revisit gaps are expected and must not abort a batch.

use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array2;
use seasonwatch_core::{Error, Raster, Result};
use tracing::debug;

use crate::season::{SeasonWindow, YearRange};

/// One entry of a time series: a capture timestamp and its raster
#[derive(Debug, Clone)]
pub struct TimeStep {
    pub timestamp: NaiveDateTime,
    pub raster: Raster<f64>,
}

impl TimeStep {
    pub fn new(timestamp: NaiveDateTime, raster: Raster<f64>) -> Self {
        Self { timestamp, raster }
    }
}

/// A capture-time-ordered raster series sharing shape and georeferencing.
///
/// Read-only input to the composite builder; construction sorts entries by
/// timestamp and checks every raster against the shape of the first.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    entries: Vec<TimeStep>,
}

impl TimeSeries {
    pub fn new(mut entries: Vec<TimeStep>) -> Result<Self> {
        let first_shape = entries
            .first()
            .map(|e| e.raster.shape())
            .ok_or(Error::EmptyInput("time series has no entries"))?;

        for entry in &entries {
            let (rows, cols) = entry.raster.shape();
            if (rows, cols) != first_shape {
                return Err(Error::SizeMismatch {
                    er: first_shape.0,
                    ec: first_shape.1,
                    ar: rows,
                    ac: cols,
                });
            }
        }

        entries.sort_by_key(|e| e.timestamp);
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shape (rows, cols) shared by every entry
    pub fn shape(&self) -> (usize, usize) {
        self.entries[0].raster.shape()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeStep> {
        self.entries.iter()
    }

    /// Entries with `start <= timestamp < end`
    fn between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> impl Iterator<Item = &TimeStep> {
        self.entries
            .iter()
            .filter(move |e| e.timestamp >= start && e.timestamp < end)
    }
}

/// Pixel-wise aggregation applied across one month's entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Total over valid observations (precipitation)
    Sum,
    /// Average over valid observations (temperature, indices)
    Mean,
}

/// One raster produced by reducing a time series over a calendar month.
///
/// `timestamp` is set to the first instant of the month; it is metadata
/// for ordering downstream, not used for re-filtering.
#[derive(Debug, Clone)]
pub struct Composite {
    pub year: i32,
    pub month: u32,
    pub timestamp: NaiveDateTime,
    pub raster: Raster<f64>,
}

/// Build one composite per (year, month) pair.
///
/// Enumeration order is outer years ascending, inner months ascending
/// within the season window, so the output length is always
/// `years.len() * season.len()`. The reducer skips invalid source pixels;
/// a pixel with no valid observation in a month is invalid in that
/// composite. The optional binary `mask` is applied after reduction:
/// pixels where the mask is invalid or zero become invalid.
pub fn build_monthly_composites(
    series: &TimeSeries,
    years: YearRange,
    season: SeasonWindow,
    reducer: Reducer,
    mask: Option<&Raster<f64>>,
) -> Result<Vec<Composite>> {
    let (rows, cols) = series.shape();
    if let Some(mask) = mask {
        if mask.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: mask.rows(),
                ac: mask.cols(),
            });
        }
    }

    let mut composites = Vec::with_capacity(years.len() * season.len());

    for year in years.iter() {
        for month in season.months() {
            let start = month_start(year, month)?;
            let end = next_month_start(year, month)?;

            let sources: Vec<&Raster<f64>> = series
                .between(start, end)
                .map(|e| &e.raster)
                .collect();

            let mut raster = reduce_month(series, &sources, reducer)?;
            if let Some(mask) = mask {
                apply_mask(&mut raster, mask);
            }

            debug!(
                year,
                month,
                sources = sources.len(),
                "built monthly composite"
            );

            composites.push(Composite {
                year,
                month,
                timestamp: start,
                raster,
            });
        }
    }

    Ok(composites)
}

fn month_start(year: i32, month: u32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(Error::InvalidRange {
            what: "month",
            value: format!("{}-{}", year, month),
            bounds: "a valid calendar month".to_string(),
        })
}

fn next_month_start(year: i32, month: u32) -> Result<NaiveDateTime> {
    if month == 12 {
        month_start(year + 1, 1)
    } else {
        month_start(year, month + 1)
    }
}

/// Reduce one month's sources pixel-wise, skipping invalid observations
fn reduce_month(
    series: &TimeSeries,
    sources: &[&Raster<f64>],
    reducer: Reducer,
) -> Result<Raster<f64>> {
    let (rows, cols) = series.shape();
    let mut sum = Array2::<f64>::zeros((rows, cols));
    let mut count = Array2::<u32>::zeros((rows, cols));

    for source in sources {
        for ((acc, n), &v) in sum
            .iter_mut()
            .zip(count.iter_mut())
            .zip(source.data().iter())
        {
            if !source.is_nodata(v) {
                *acc += v;
                *n += 1;
            }
        }
    }

    let data = sum
        .iter()
        .zip(count.iter())
        .map(|(&s, &n)| {
            if n == 0 {
                f64::NAN
            } else {
                match reducer {
                    Reducer::Sum => s,
                    Reducer::Mean => s / n as f64,
                }
            }
        })
        .collect::<Vec<f64>>();

    // Carry the series georeferencing onto the composite
    let template = &series.entries[0].raster;
    let mut raster = template.with_same_meta::<f64>();
    raster.set_nodata(Some(f64::NAN));
    *raster.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(raster)
}

/// Invalidate pixels outside a binary mask (invalid or zero mask cells)
fn apply_mask(raster: &mut Raster<f64>, mask: &Raster<f64>) {
    for (out, &m) in raster.data_mut().iter_mut().zip(mask.data().iter()) {
        if mask.is_nodata(m) || m == 0.0 {
            *out = f64::NAN;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn step(year: i32, month: u32, day: u32, value: f64) -> TimeStep {
        TimeStep::new(date(year, month, day), Raster::filled(2, 2, value))
    }

    fn simple_series() -> TimeSeries {
        TimeSeries::new(vec![
            step(2000, 3, 1, 1.0),
            step(2000, 3, 15, 2.0),
            step(2000, 4, 2, 5.0),
            step(2001, 3, 10, 7.0),
            step(2001, 4, 20, 9.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(matches!(
            TimeSeries::new(vec![]),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let entries = vec![
            step(2000, 3, 1, 1.0),
            TimeStep::new(date(2000, 3, 2), Raster::filled(3, 2, 1.0)),
        ];
        assert!(matches!(
            TimeSeries::new(entries),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_composite_count_and_order() {
        let series = simple_series();
        let years = YearRange::new(2000, 2001).unwrap();
        let season = SeasonWindow::new(3, 4).unwrap();

        let composites =
            build_monthly_composites(&series, years, season, Reducer::Sum, None).unwrap();

        assert_eq!(composites.len(), 4);
        let pairs: Vec<(i32, u32)> = composites.iter().map(|c| (c.year, c.month)).collect();
        assert_eq!(pairs, vec![(2000, 3), (2000, 4), (2001, 3), (2001, 4)]);

        // Strictly increasing lexicographic order
        for pair in pairs.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_sum_and_mean_reduction() {
        let series = simple_series();
        let years = YearRange::new(2000, 2000).unwrap();
        let season = SeasonWindow::new(3, 3).unwrap();

        let sum = build_monthly_composites(&series, years, season, Reducer::Sum, None).unwrap();
        assert_relative_eq!(sum[0].raster.get(0, 0).unwrap(), 3.0);

        let mean =
            build_monthly_composites(&series, years, season, Reducer::Mean, None).unwrap();
        assert_relative_eq!(mean[0].raster.get(0, 0).unwrap(), 1.5);
    }

    #[test]
    fn test_missing_month_yields_invalid_composite() {
        let series = simple_series();
        let years = YearRange::new(2000, 2000).unwrap();
        let season = SeasonWindow::new(3, 5).unwrap();

        let composites =
            build_monthly_composites(&series, years, season, Reducer::Sum, None).unwrap();

        // May has no entries; the pipeline continues with an all-invalid raster
        assert_eq!(composites.len(), 3);
        let may = &composites[2];
        assert_eq!(may.month, 5);
        assert!(may.raster.get(0, 0).unwrap().is_nan());
        assert_eq!(may.raster.statistics().valid_count, 0);
    }

    #[test]
    fn test_month_interval_is_half_open() {
        // An entry on April 1st must not contribute to March
        let series = TimeSeries::new(vec![step(2000, 3, 31, 1.0), step(2000, 4, 1, 100.0)])
            .unwrap();
        let years = YearRange::new(2000, 2000).unwrap();
        let season = SeasonWindow::new(3, 3).unwrap();

        let composites =
            build_monthly_composites(&series, years, season, Reducer::Sum, None).unwrap();
        assert_relative_eq!(composites[0].raster.get(0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_per_pixel_invalid_observations_skipped() {
        let mut cloudy = Raster::filled(2, 2, 4.0);
        cloudy.set(0, 0, f64::NAN).unwrap();
        let series = TimeSeries::new(vec![
            TimeStep::new(date(2000, 3, 1), Raster::filled(2, 2, 2.0)),
            TimeStep::new(date(2000, 3, 9), cloudy),
        ])
        .unwrap();

        let composites = build_monthly_composites(
            &series,
            YearRange::new(2000, 2000).unwrap(),
            SeasonWindow::new(3, 3).unwrap(),
            Reducer::Mean,
            None,
        )
        .unwrap();

        // (0,0) has one valid observation, the rest have two
        assert_relative_eq!(composites[0].raster.get(0, 0).unwrap(), 2.0);
        assert_relative_eq!(composites[0].raster.get(1, 1).unwrap(), 3.0);
    }

    #[test]
    fn test_mask_applied_after_reduction() {
        let series = simple_series();
        let mut mask = Raster::filled(2, 2, 1.0);
        mask.set(0, 1, 0.0).unwrap();
        mask.set(1, 0, f64::NAN).unwrap();

        let composites = build_monthly_composites(
            &series,
            YearRange::new(2000, 2000).unwrap(),
            SeasonWindow::new(3, 3).unwrap(),
            Reducer::Sum,
            Some(&mask),
        )
        .unwrap();

        let raster = &composites[0].raster;
        assert_relative_eq!(raster.get(0, 0).unwrap(), 3.0);
        assert!(raster.get(0, 1).unwrap().is_nan());
        assert!(raster.get(1, 0).unwrap().is_nan());
        assert_relative_eq!(raster.get(1, 1).unwrap(), 3.0);
    }

    #[test]
    fn test_mask_shape_mismatch_rejected() {
        let series = simple_series();
        let mask = Raster::filled(3, 3, 1.0);
        assert!(matches!(
            build_monthly_composites(
                &series,
                YearRange::new(2000, 2000).unwrap(),
                SeasonWindow::new(3, 3).unwrap(),
                Reducer::Sum,
                Some(&mask),
            ),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_timestamp_is_first_instant_of_month() {
        let series = simple_series();
        let composites = build_monthly_composites(
            &series,
            YearRange::new(2000, 2001).unwrap(),
            SeasonWindow::new(3, 4).unwrap(),
            Reducer::Sum,
            None,
        )
        .unwrap();

        assert_eq!(composites[0].timestamp, date(2000, 3, 1));
        assert_eq!(composites[3].timestamp, date(2001, 4, 1));
    }
}
