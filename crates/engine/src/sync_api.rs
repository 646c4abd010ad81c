//! Blocking (synchronous) API for batch jobs.
//!
//! Wraps [`EngineClient`] with a current-thread Tokio runtime so CLI
//! batch jobs don't manage an async runtime themselves.

use seasonwatch_core::Raster;
use std::sync::Arc;

use crate::auth::ApiAuth;
use crate::client::{EngineClient, EngineClientOptions};
use crate::error::{EngineError, Result};
use crate::jobs::{wait_for_completion, CancelToken, PollOptions};
use crate::models::{ExportRequest, ImageQuery, JobStatus, RemoteImage};

/// Blocking wrapper around [`EngineClient`]
pub struct EngineClientBlocking {
    rt: tokio::runtime::Runtime,
    inner: EngineClient,
}

impl EngineClientBlocking {
    /// Create a blocking client for a service endpoint
    pub fn new(
        base_url: impl Into<String>,
        auth: Arc<dyn ApiAuth>,
        options: EngineClientOptions,
    ) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(EngineError::Io)?;

        let inner = EngineClient::new(base_url, auth, options)?;
        Ok(Self { rt, inner })
    }

    /// Search the collection (blocking)
    pub fn query_images(&self, query: &ImageQuery) -> Result<Vec<RemoteImage>> {
        self.rt.block_on(self.inner.query_images(query))
    }

    /// Download and decode one image raster (blocking)
    pub fn fetch_raster(&self, image: &RemoteImage) -> Result<Raster<f64>> {
        self.rt.block_on(self.inner.fetch_raster(image))
    }

    /// Submit an export job (blocking)
    pub fn export_to_asset(&self, request: &ExportRequest, data: Vec<u8>) -> Result<JobStatus> {
        self.rt.block_on(self.inner.export_to_asset(request, data))
    }

    /// Fetch job status (blocking)
    pub fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.rt.block_on(self.inner.job_status(job_id))
    }

    /// Cancel a job (blocking)
    pub fn cancel_job(&self, job_id: &str) -> Result<JobStatus> {
        self.rt.block_on(self.inner.cancel_job(job_id))
    }

    /// Delete an asset, `Ok(false)` when it did not exist (blocking)
    pub fn delete_asset(&self, asset_id: &str) -> Result<bool> {
        self.rt.block_on(self.inner.delete_asset(asset_id))
    }

    /// Poll a job until it leaves the active state (blocking)
    pub fn wait_for_completion(
        &self,
        job_id: &str,
        options: &PollOptions,
        cancel: &CancelToken,
    ) -> Result<JobStatus> {
        self.rt
            .block_on(wait_for_completion(&self.inner, job_id, options, cancel))
    }
}
