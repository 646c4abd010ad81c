//! # Seasonwatch Core
//!
//! Core types and I/O for the seasonwatch toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: single-band georeferenced grid
//! - `MultibandRaster<T>`: ordered, labeled band stack
//! - `GeoTransform`: affine georeferencing (north-up)
//! - `CRS` and `UtmProjection`: coordinate reference handling
//! - GeoTIFF reading/writing with per-band descriptions
//! - Vector features and GeoJSON output

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::{UtmProjection, CRS};
pub use error::{Error, Result};
pub use raster::{GeoTransform, MultibandRaster, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{UtmProjection, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, MultibandRaster, Raster, RasterElement};
}
