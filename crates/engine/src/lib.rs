//! # Seasonwatch Engine
//!
//! Narrow client for the remote imaging service: query an image
//! collection by date range and region, download image rasters, submit
//! asset-export jobs, poll them to completion, and delete assets for
//! overwrite. The service's lazy expression graph stays on the service
//! side; this crate only speaks its job/asset HTTP API.

pub mod auth;
pub mod client;
pub mod error;
pub mod jobs;
pub mod models;
pub mod sync_api;

pub use auth::{ApiAuth, NoAuth, ServiceAccountAuth};
pub use client::{EngineClient, EngineClientOptions};
pub use error::{EngineError, Result};
pub use jobs::{wait_for_completion, CancelToken, JobMonitor, PollOptions};
pub use models::{
    asset_path, product_filename, ExportRequest, ImageQuery, JobState, JobStatus, RemoteImage,
};

/// Blocking API re-exported as `blocking` module.
pub mod blocking {
    pub use crate::sync_api::*;
}
