//! Request/response models for the imaging-service API

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Image search
// ---------------------------------------------------------------------------

/// Body for `POST /images/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageQuery {
    /// Collection identifier, e.g. `"UCSB-CHG/CHIRPS/DAILY"`
    pub collection: String,

    /// First capture date included
    pub start_date: NaiveDate,

    /// First capture date excluded
    pub end_date: NaiveDate,

    /// Band to select, if the collection has several
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,

    /// Region of interest `[west, south, east, north]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    /// Maximum number of images returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ImageQuery {
    pub fn new(
        collection: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            collection: collection.into(),
            start_date,
            end_date,
            band: None,
            bbox: None,
            limit: None,
        }
    }

    /// Select a single band
    pub fn band(mut self, band: &str) -> Self {
        self.band = Some(band.to_string());
        self
    }

    /// Restrict to a bounding box `[west, south, east, north]`
    pub fn bbox(mut self, west: f64, south: f64, east: f64, north: f64) -> Self {
        self.bbox = Some([west, south, east, north]);
        self
    }

    /// Cap the number of returned images
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

/// One image in a search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteImage {
    /// Service-assigned image identifier
    pub id: String,
    /// Capture timestamp
    pub timestamp: NaiveDateTime,
    /// Download URL for the image raster (GeoTIFF)
    pub href: String,
}

/// Response of `POST /images/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageList {
    pub images: Vec<RemoteImage>,
}

// ---------------------------------------------------------------------------
// Export jobs
// ---------------------------------------------------------------------------

/// Parameters of an asset-export job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Destination asset identifier
    pub asset_id: String,
    /// Human-readable job description
    pub description: String,
    /// Export region `[west, south, east, north]`
    pub region: [f64; 4],
    /// Output resolution in meters
    pub scale: f64,
    /// Output CRS authority string
    pub crs: String,
    /// Pixel-count guard for the service
    pub max_pixels: f64,
}

impl ExportRequest {
    pub fn new(asset_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            description: description.into(),
            region: [-180.0, -90.0, 180.0, 90.0],
            scale: 1000.0,
            crs: "EPSG:4326".to_string(),
            max_pixels: 1e13,
        }
    }

    pub fn region(mut self, west: f64, south: f64, east: f64, north: f64) -> Self {
        self.region = [west, south, east, north];
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn crs(mut self, crs: &str) -> Self {
        self.crs = crs.to_string();
        self
    }

    pub fn max_pixels(mut self, max_pixels: f64) -> Self {
        self.max_pixels = max_pixels;
        self
    }
}

/// Lifecycle state of a remote job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Whether the job is still being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Pending | JobState::Running)
    }
}

/// Status report for a submitted job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: String,
    pub state: JobState,
    /// Populated by the service when `state` is `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Asset naming
// ---------------------------------------------------------------------------

/// Full asset path `{project}/assets/{folder}/{name}`
pub fn asset_path(project: &str, folder: &str, name: &str) -> String {
    format!("{}/assets/{}/{}", project, folder, name)
}

/// Deterministic product file name `{product}_{year_start}_{year_end}`
pub fn product_filename(product: &str, year_start: i32, year_end: i32) -> String {
    format!("{}_{}_{}", product, year_start, year_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_serialization() {
        let query = ImageQuery::new(
            "UCSB-CHG/CHIRPS/DAILY",
            NaiveDate::from_ymd_opt(2000, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2000, 9, 1).unwrap(),
        )
        .bbox(33.9, -0.6, 35.1, 0.6)
        .limit(500);

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["collection"], "UCSB-CHG/CHIRPS/DAILY");
        assert_eq!(json["start_date"], "2000-03-01");
        assert_eq!(json["limit"], 500);
        // Unset fields are omitted entirely
        assert!(json.get("band").is_none());
    }

    #[test]
    fn test_job_state_parsing() {
        let status: JobStatus = serde_json::from_str(
            r#"{"id": "job-7", "state": "RUNNING"}"#,
        )
        .unwrap();
        assert_eq!(status.state, JobState::Running);
        assert!(status.state.is_active());
        assert!(status.error_message.is_none());

        let failed: JobStatus = serde_json::from_str(
            r#"{"id": "job-7", "state": "FAILED", "error_message": "quota exceeded"}"#,
        )
        .unwrap();
        assert!(!failed.state.is_active());
        assert_eq!(failed.error_message.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_asset_naming_convention() {
        let name = product_filename("CHIRPS_precip", 2000, 2025);
        assert_eq!(name, "CHIRPS_precip_2000_2025");
        assert_eq!(
            asset_path("projects/cropmapping", "rwanda", &name),
            "projects/cropmapping/assets/rwanda/CHIRPS_precip_2000_2025"
        );
    }

    #[test]
    fn test_export_request_defaults() {
        let req = ExportRequest::new("projects/p/assets/f/x", "x")
            .region(33.9, -0.6, 35.1, 0.6)
            .scale(5000.0);
        assert_eq!(req.crs, "EPSG:4326");
        assert_eq!(req.max_pixels, 1e13);
        assert_eq!(req.region, [33.9, -0.6, 35.1, 0.6]);
    }
}
