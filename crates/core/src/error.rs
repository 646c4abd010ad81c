//! Error types for seasonwatch

use thiserror::Error;

/// Main error type for seasonwatch operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid range: {what} = {value} (expected {bounds})")]
    InvalidRange {
        what: &'static str,
        value: String,
        bounds: String,
    },

    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Cannot parse band label: {label:?}")]
    BandLabel { label: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for seasonwatch operations
pub type Result<T> = std::result::Result<T, Error>;
