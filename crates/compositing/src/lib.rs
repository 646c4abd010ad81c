//! # Seasonwatch Compositing
//!
//! Temporal compositing and post-processing for satellite time series:
//!
//! - **composite**: per-month composites over a multi-year season window
//! - **stack**: band renaming and stacking into one multi-band raster
//! - **deviation**: current-year anomaly against the historical seasonal mean
//! - **relabel**: deterministic band descriptions for existing stacks
//! - **buffer**: tabular points to buffered polygons

pub mod buffer;
pub mod composite;
pub mod deviation;
mod maybe_rayon;
pub mod relabel;
pub mod season;
pub mod stack;

pub use composite::{build_monthly_composites, Composite, Reducer, TimeSeries, TimeStep};
pub use deviation::{deviation_from_historical, yearly_seasonal_means};
pub use season::{BandLabel, SeasonWindow, YearRange};
pub use stack::stack_composites;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::{buffer_records, read_points_csv, BufferParams, PointRecord};
    pub use crate::composite::{
        build_monthly_composites, Composite, Reducer, TimeSeries, TimeStep,
    };
    pub use crate::deviation::{deviation_from_historical, yearly_seasonal_means};
    pub use crate::relabel::relabel_stack;
    pub use crate::season::{BandLabel, SeasonWindow, YearRange};
    pub use crate::stack::stack_composites;
    pub use seasonwatch_core::prelude::*;
}
