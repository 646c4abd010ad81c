//! TOML configuration for the export batch job.
//!
//! Every job parameter lives in the config file; the command line only
//! points at it. See `demos/export.toml` for a complete example.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use seasonwatch_compositing::{Reducer, SeasonWindow, YearRange};
use seasonwatch_engine::PollOptions;

/// Top-level export job configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub product: ProductConfig,
    pub region: RegionConfig,
    pub time: TimeConfig,
    pub export: ExportSection,
    #[serde(default)]
    pub poll: PollConfig,
}

/// What to composite and how to reduce it
#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    /// Product name, used in the output asset filename
    pub name: String,
    /// Band label prefix, e.g. `rain` or `temp`
    pub prefix: String,
    /// Remote collection identifier
    pub collection: String,
    /// Band to select from the collection
    #[serde(default)]
    pub band: Option<String>,
    /// `sum` or `mean`
    pub reducer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    /// `[west, south, east, north]` in degrees
    pub bbox: [f64; 4],
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeConfig {
    pub year_start: i32,
    pub year_end: i32,
    /// First month of the season window (1-12)
    pub season_start: u32,
    /// Last month of the season window (inclusive)
    pub season_end: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSection {
    pub base_url: String,
    /// Service account key file; anonymous access when absent
    #[serde(default)]
    pub credentials: Option<PathBuf>,
    pub project: String,
    pub folder: String,
    /// Export resolution in meters
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_crs")]
    pub crs: String,
    #[serde(default = "default_max_pixels")]
    pub max_pixels: f64,
    /// Optional validity mask GeoTIFF applied after reduction
    #[serde(default)]
    pub mask: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Give up after this many seconds; absent means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            timeout_secs: None,
        }
    }
}

fn default_scale() -> f64 {
    1000.0
}

fn default_crs() -> String {
    "EPSG:4326".to_string()
}

fn default_max_pixels() -> f64 {
    1e13
}

fn default_poll_interval() -> u64 {
    30
}

impl ExportConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ExportConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.reducer()?;
        self.years()?;
        self.season()?;
        Ok(())
    }

    pub fn reducer(&self) -> Result<Reducer> {
        match self.product.reducer.to_lowercase().as_str() {
            "sum" => Ok(Reducer::Sum),
            "mean" | "avg" => Ok(Reducer::Mean),
            other => bail!("Unknown reducer: {}. Use sum or mean.", other),
        }
    }

    pub fn years(&self) -> Result<YearRange> {
        YearRange::new(self.time.year_start, self.time.year_end)
            .context("Invalid [time] year range")
    }

    pub fn season(&self) -> Result<SeasonWindow> {
        SeasonWindow::new(self.time.season_start, self.time.season_end)
            .context("Invalid [time] season window")
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_secs(self.poll.interval_secs),
            timeout: self.poll.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        [product]
        name = "chirps_precip"
        prefix = "rain"
        collection = "UCSB-CHG/CHIRPS/PENTAD"
        band = "precipitation"
        reducer = "sum"

        [region]
        name = "mozambique"
        bbox = [30.2, -26.9, 40.8, -10.5]

        [time]
        year_start = 2000
        year_end = 2013
        season_start = 3
        season_end = 8

        [export]
        base_url = "https://imaging.example.com/v1"
        credentials = "key.json"
        project = "projects/seasonwatch"
        folder = "composites"
        scale = 5000.0

        [poll]
        interval_secs = 30
        timeout_secs = 7200
    "#;

    #[test]
    fn parses_full_config() {
        let config: ExportConfig = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.product.prefix, "rain");
        assert_eq!(config.product.band.as_deref(), Some("precipitation"));
        assert_eq!(config.region.bbox[0], 30.2);
        assert_eq!(config.time.year_start, 2000);
        assert_eq!(config.export.scale, 5000.0);
        assert_eq!(config.export.crs, "EPSG:4326");
        assert_eq!(config.poll.timeout_secs, Some(7200));
        config.validate().unwrap();
    }

    #[test]
    fn reducer_names() {
        let mut config: ExportConfig = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.reducer().unwrap(), Reducer::Sum);
        config.product.reducer = "mean".to_string();
        assert_eq!(config.reducer().unwrap(), Reducer::Mean);
        config.product.reducer = "median".to_string();
        assert!(config.reducer().is_err());
    }

    #[test]
    fn poll_section_is_optional() {
        let trimmed = EXAMPLE.split("[poll]").next().unwrap();
        let config: ExportConfig = toml::from_str(trimmed).unwrap();
        assert_eq!(config.poll.interval_secs, 30);
        assert!(config.poll.timeout_secs.is_none());
        assert!(config.poll_options().timeout.is_none());
    }

    #[test]
    fn season_window_validated() {
        let broken = EXAMPLE.replace("season_start = 3", "season_start = 13");
        let config: ExportConfig = toml::from_str(&broken).unwrap();
        assert!(config.validate().is_err());
    }
}
