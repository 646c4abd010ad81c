//! Ordered, labeled band stack

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::Array2;

/// An ordered sequence of equally-shaped bands sharing georeferencing.
///
/// Bands keep their insertion order and each carries a string label
/// (the band description written to / read from GeoTIFF). The stack is
/// built by seeding it with a first band and appending the rest.
#[derive(Debug, Clone)]
pub struct MultibandRaster<T: RasterElement> {
    bands: Vec<Array2<T>>,
    labels: Vec<String>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> MultibandRaster<T> {
    /// Seed a stack with its first band, taking georeferencing from it.
    pub fn from_band(band: Raster<T>, label: impl Into<String>) -> Self {
        let transform = *band.transform();
        let crs = band.crs().cloned();
        let nodata = band.nodata();
        Self {
            bands: vec![band.into_array()],
            labels: vec![label.into()],
            transform,
            crs,
            nodata,
        }
    }

    /// Append a band. Its shape must match the existing bands.
    pub fn push_band(&mut self, band: Raster<T>, label: impl Into<String>) -> Result<()> {
        let (rows, cols) = self.shape();
        if band.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: band.rows(),
                ac: band.cols(),
            });
        }
        self.bands.push(band.into_array());
        self.labels.push(label.into());
        Ok(())
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Shape of every band as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].dim()
    }

    /// Band data at index (0-based)
    pub fn band(&self, index: usize) -> Option<&Array2<T>> {
        self.bands.get(index)
    }

    /// Band label at index (0-based)
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of the band with the given label, if present
    pub fn find_band(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Iterate bands with their labels in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array2<T>)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.bands.iter())
    }

    /// Extract one band as a standalone `Raster`, copying the stack metadata
    pub fn to_raster(&self, index: usize) -> Result<Raster<T>> {
        let data = self
            .bands
            .get(index)
            .ok_or(Error::IndexOutOfBounds {
                row: 0,
                col: index,
                rows: self.shape().0,
                cols: self.band_count(),
            })?
            .clone();
        let mut raster = Raster::from_array(data);
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_nodata(self.nodata);
        Ok(raster)
    }

    /// Replace every band label, by position
    pub fn set_labels(&mut self, labels: Vec<String>) -> Result<()> {
        if labels.len() != self.bands.len() {
            return Err(Error::SizeMismatch {
                er: self.bands.len(),
                ec: 1,
                ar: labels.len(),
                ac: 1,
            });
        }
        self.labels = labels;
        Ok(())
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        Raster::filled(rows, cols, value)
    }

    #[test]
    fn test_seed_and_append() {
        let mut stack = MultibandRaster::from_band(band(2, 3, 1.0), "a_2000_1");
        stack.push_band(band(2, 3, 2.0), "a_2000_2").unwrap();

        assert_eq!(stack.band_count(), 2);
        assert_eq!(stack.shape(), (2, 3));
        assert_eq!(stack.label(0), Some("a_2000_1"));
        assert_eq!(stack.label(1), Some("a_2000_2"));
        assert_eq!(stack.band(1).unwrap()[(0, 0)], 2.0);
    }

    #[test]
    fn test_push_shape_mismatch() {
        let mut stack = MultibandRaster::from_band(band(2, 3, 1.0), "a");
        let err = stack.push_band(band(3, 3, 2.0), "b").unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }

    #[test]
    fn test_find_band_and_extract() {
        let mut seed = band(2, 2, 5.0);
        seed.set_transform(GeoTransform::new(30.0, 1.0, 0.05, -0.05));
        let mut stack = MultibandRaster::from_band(seed, "rain_2000_1");
        stack.push_band(band(2, 2, 7.0), "rain_2000_2").unwrap();

        assert_eq!(stack.find_band("rain_2000_2"), Some(1));
        assert_eq!(stack.find_band("rain_2001_1"), None);

        let extracted = stack.to_raster(1).unwrap();
        assert_eq!(extracted.get(0, 0).unwrap(), 7.0);
        assert_eq!(extracted.transform().origin_x, 30.0);
    }
}
