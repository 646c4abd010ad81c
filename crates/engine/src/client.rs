//! Async client for the imaging-service HTTP API

use reqwest::{Client, RequestBuilder, Response};
use seasonwatch_core::io::read_geotiff_from_buffer;
use seasonwatch_core::Raster;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::auth::ApiAuth;
use crate::error::{EngineError, Result};
use crate::models::{ExportRequest, ImageList, ImageQuery, JobStatus, RemoteImage};

/// Configuration for [`EngineClient`]
pub struct EngineClientOptions {
    /// Per-request timeout (default 30 s)
    pub request_timeout: Duration,
}

impl Default for EngineClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Narrow asynchronous client for the imaging service.
///
/// Exposes exactly the capabilities the batch jobs consume: image search,
/// raster download, export submission, job status/cancel, asset deletion.
/// Requests are never retried; a failed call surfaces immediately.
pub struct EngineClient {
    base_url: String,
    client: Client,
    auth: Arc<dyn ApiAuth>,
}

impl EngineClient {
    /// Create a new client for a service endpoint
    pub fn new(
        base_url: impl Into<String>,
        auth: Arc<dyn ApiAuth>,
        options: EngineClientOptions,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn signed(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let mut headers = Vec::new();
        self.auth.sign_request(&mut headers)?;
        let mut req = req;
        for (key, value) in headers {
            req = req.header(key, value);
        }
        Ok(req)
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(EngineError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Search the collection for images in a date range and region
    pub async fn query_images(&self, query: &ImageQuery) -> Result<Vec<RemoteImage>> {
        let req = self
            .signed(self.client.post(self.endpoint("images/search")))?
            .json(query);
        let response = self.check(req.send().await?).await?;
        let list: ImageList = response.json().await?;

        debug!(
            collection = %query.collection,
            images = list.images.len(),
            "image search"
        );
        Ok(list.images)
    }

    /// Download one image's raster and decode it.
    ///
    /// The service serves single-band GeoTIFFs for band-selected queries;
    /// the first band is returned.
    pub async fn fetch_raster(&self, image: &RemoteImage) -> Result<Raster<f64>> {
        let req = self.signed(self.client.get(&image.href))?;
        let response = self.check(req.send().await?).await?;
        let bytes = response.bytes().await?;

        let stack = read_geotiff_from_buffer(&bytes)?;
        Ok(stack.to_raster(0)?)
    }

    /// Submit an export job for a raster payload.
    ///
    /// Two calls: the job is registered from the request metadata, then the
    /// payload is uploaded against the returned job id. The status after
    /// upload is returned; the job proceeds asynchronously on the service.
    pub async fn export_to_asset(
        &self,
        request: &ExportRequest,
        data: Vec<u8>,
    ) -> Result<JobStatus> {
        let req = self
            .signed(self.client.post(self.endpoint("exports")))?
            .json(request);
        let response = self.check(req.send().await?).await?;
        let submitted: JobStatus = response.json().await?;

        let upload = self
            .signed(
                self.client
                    .put(self.endpoint(&format!("exports/{}/data", submitted.id))),
            )?
            .header("Content-Type", "image/tiff")
            .body(data);
        let response = self.check(upload.send().await?).await?;
        let status: JobStatus = response.json().await?;

        info!(job = %status.id, asset = %request.asset_id, "export submitted");
        Ok(status)
    }

    /// Fetch the current status of a job
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let req = self.signed(
            self.client
                .get(self.endpoint(&format!("jobs/{}", job_id))),
        )?;
        let response = self.check(req.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Ask the service to cancel a job
    pub async fn cancel_job(&self, job_id: &str) -> Result<JobStatus> {
        let req = self.signed(
            self.client
                .post(self.endpoint(&format!("jobs/{}/cancel", job_id))),
        )?;
        let response = self.check(req.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Delete a stored asset so the name can be reused.
    ///
    /// Returns `Ok(false)` when no such asset exists (logged, safe to
    /// proceed with the export). Any other failure is an error: a
    /// permission problem must not be mistaken for a clean slate.
    pub async fn delete_asset(&self, asset_id: &str) -> Result<bool> {
        let req = self
            .signed(self.client.delete(self.endpoint("assets")))?
            .query(&[("asset", asset_id)]);
        let response = req.send().await?;

        if response.status().as_u16() == 404 {
            info!(asset = asset_id, "no existing asset to delete");
            return Ok(false);
        }
        self.check(response).await?;
        info!(asset = asset_id, "existing asset deleted for overwrite");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NoAuth;

    #[test]
    fn test_endpoint_joining() {
        let client = EngineClient::new(
            "https://imaging.example.com/api/v1/",
            Arc::new(NoAuth),
            EngineClientOptions::default(),
        )
        .unwrap();

        assert_eq!(
            client.endpoint("images/search"),
            "https://imaging.example.com/api/v1/images/search"
        );
        assert_eq!(
            client.endpoint("/jobs/job-1"),
            "https://imaging.example.com/api/v1/jobs/job-1"
        );
    }
}
