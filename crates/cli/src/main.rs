//! Seasonwatch CLI - seasonal raster compositing batch jobs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use seasonwatch_compositing::buffer::{buffer_records, read_points_csv, BufferParams};
use seasonwatch_compositing::relabel::relabel_stack;
use seasonwatch_compositing::{
    build_monthly_composites, deviation_from_historical, stack_composites, yearly_seasonal_means,
    SeasonWindow, TimeSeries, TimeStep,
};
use seasonwatch_core::io::{read_geotiff, write_geotiff, write_geotiff_to_buffer};
use seasonwatch_core::vector::write_geojson;
use seasonwatch_core::{MultibandRaster, UtmProjection};
use seasonwatch_engine::blocking::EngineClientBlocking;
use seasonwatch_engine::{
    asset_path, product_filename, ApiAuth, CancelToken, EngineClientOptions, ExportRequest,
    ImageQuery, JobState, NoAuth, ServiceAccountAuth,
};

mod config;
use config::ExportConfig;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "seasonwatch")]
#[command(author, version, about = "Seasonal raster compositing batch jobs", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an export batch job from a TOML config file
    Export {
        /// Job configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Directory for the local composite copy
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Current-year deviation from the historical seasonal mean
    Deviation {
        /// Input multi-band stack with {prefix}_{year}_{index} labels
        input: PathBuf,
        /// Output single-band file
        output: PathBuf,
        /// Band label prefix
        #[arg(short, long)]
        prefix: String,
        /// Year to compare against all earlier years in the stack
        #[arg(short, long)]
        year: i32,
    },
    /// Rewrite band descriptions as {prefix}_{year}_{index}
    Relabel {
        /// Input multi-band stack
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Band label prefix
        #[arg(short, long)]
        prefix: String,
        /// Year of the first band
        #[arg(long)]
        start_year: i32,
        /// First month of the season window (1-12)
        #[arg(long, default_value = "3")]
        season_start: u32,
        /// Last month of the season window (inclusive)
        #[arg(long, default_value = "8")]
        season_end: u32,
    },
    /// Buffer CSV points into polygons, written as GeoJSON
    BufferPoints {
        /// Input CSV with Longitude/Latitude columns
        input: PathBuf,
        /// Output GeoJSON file
        output: PathBuf,
        /// Buffer radius in meters
        #[arg(short, long, default_value = "2500")]
        distance: f64,
        /// UTM zone to buffer in; derived from the first point when absent
        #[arg(long)]
        zone: Option<u8>,
        /// Southern hemisphere zone
        #[arg(long)]
        south: bool,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb
}

fn read_stack(path: &PathBuf) -> Result<MultibandRaster<f64>> {
    let pb = spinner("Reading raster...");
    let stack = read_geotiff(path).context("Failed to read raster")?;
    pb.finish_and_clear();
    let (rows, cols) = stack.shape();
    info!(
        "Input: {} x {}, {} band(s)",
        cols,
        rows,
        stack.band_count()
    );
    Ok(stack)
}

fn write_stack(stack: &MultibandRaster<f64>, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(stack, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn month_day_one(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("Invalid month: {}-{}", year, month))
}

/// First day after the season window of its last year, for a half-open query
fn query_end(year_end: i32, season_end: u32) -> Result<NaiveDate> {
    if season_end == 12 {
        month_day_one(year_end + 1, 1)
    } else {
        month_day_one(year_end, season_end + 1)
    }
}

// ─── Export ─────────────────────────────────────────────────────────────

fn run_export(config_path: &PathBuf, out_dir: &PathBuf) -> Result<()> {
    let config = ExportConfig::from_file(config_path)?;
    let years = config.years()?;
    let season = config.season()?;
    let reducer = config.reducer()?;
    let [west, south, east, north] = config.region.bbox;

    let auth: Arc<dyn ApiAuth> = match &config.export.credentials {
        Some(path) => Arc::new(ServiceAccountAuth::from_file(path)?),
        None => Arc::new(NoAuth),
    };
    let client = EngineClientBlocking::new(
        &config.export.base_url,
        auth,
        EngineClientOptions::default(),
    )?;

    // Query the whole multi-year window once.
    let start_date = month_day_one(config.time.year_start, config.time.season_start)?;
    let end_date = query_end(config.time.year_end, config.time.season_end)?;
    let mut query = ImageQuery::new(&config.product.collection, start_date, end_date)
        .bbox(west, south, east, north);
    if let Some(band) = &config.product.band {
        query = query.band(band);
    }

    let pb = spinner("Searching collection...");
    let images = client.query_images(&query)?;
    pb.finish_and_clear();
    if images.is_empty() {
        anyhow::bail!(
            "No images in {} between {} and {}",
            config.product.collection,
            start_date,
            end_date
        );
    }
    info!("Found {} image(s)", images.len());

    let pb = progress(images.len() as u64, "Downloading");
    let mut entries = Vec::with_capacity(images.len());
    for image in &images {
        let raster = client
            .fetch_raster(image)
            .with_context(|| format!("Failed to fetch image {}", image.id))?;
        entries.push(TimeStep::new(image.timestamp, raster));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let mask = match &config.export.mask {
        Some(path) => {
            let stack = read_geotiff(path).context("Failed to read mask")?;
            Some(stack.to_raster(0)?)
        }
        None => None,
    };

    let start = Instant::now();
    let series = TimeSeries::new(entries)?;
    let composites = build_monthly_composites(&series, years, season, reducer, mask.as_ref())?;
    let stack = stack_composites(&composites, &config.product.prefix, &season)?;
    let elapsed = start.elapsed();
    info!(
        "Built {} band(s): {} .. {}",
        stack.band_count(),
        stack.labels().first().map(String::as_str).unwrap_or(""),
        stack.labels().last().map(String::as_str).unwrap_or("")
    );

    let filename = format!(
        "{}.tif",
        product_filename(
            &config.product.name,
            config.time.year_start,
            config.time.year_end
        )
    );
    let local = out_dir.join(&filename);
    write_stack(&stack, &local)?;
    done("Composite stack", &local, elapsed);

    // Delete-then-recreate: a stale asset under the same path would
    // otherwise shadow the new export.
    let asset = asset_path(&config.export.project, &config.export.folder, &filename);
    if client.delete_asset(&asset)? {
        info!("Deleted existing asset {}", asset);
    }

    let request = ExportRequest::new(
        &asset,
        format!("{} {}", config.product.name, config.region.name),
    )
    .region(west, south, east, north)
    .scale(config.export.scale)
    .crs(&config.export.crs)
    .max_pixels(config.export.max_pixels);

    let payload = write_geotiff_to_buffer(&stack)?;
    let submitted = client.export_to_asset(&request, payload)?;
    info!("Submitted export job {}", submitted.id);

    let pb = spinner("Waiting for export job...");
    let status = client.wait_for_completion(
        &submitted.id,
        &config.poll_options(),
        &CancelToken::new(),
    )?;
    pb.finish_and_clear();

    match status.state {
        JobState::Completed => {
            println!("Export complete: {}", asset);
            Ok(())
        }
        JobState::Failed => anyhow::bail!(
            "Export job {} failed: {}",
            status.id,
            status.error_message.as_deref().unwrap_or("no error message")
        ),
        other => anyhow::bail!("Export job {} ended as {:?}", status.id, other),
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Export { config, out_dir } => run_export(&config, &out_dir)?,

        Commands::Deviation {
            input,
            output,
            prefix,
            year,
        } => {
            let stack = read_stack(&input)?;
            let start = Instant::now();
            let yearly = yearly_seasonal_means(&stack, &prefix)?;
            let deviation = deviation_from_historical(&yearly, year)?;
            let elapsed = start.elapsed();
            let result =
                MultibandRaster::from_band(deviation, format!("{}_dev_{}", prefix, year));
            write_stack(&result, &output)?;
            done("Deviation", &output, elapsed);
        }

        Commands::Relabel {
            input,
            output,
            prefix,
            start_year,
            season_start,
            season_end,
        } => {
            let season = SeasonWindow::new(season_start, season_end)?;
            let mut stack = read_stack(&input)?;
            relabel_stack(&mut stack, &prefix, start_year, &season)?;
            write_stack(&stack, &output)?;
            println!("Relabeled {} band(s):", stack.band_count());
            for label in stack.labels() {
                println!("  {}", label);
            }
        }

        Commands::BufferPoints {
            input,
            output,
            distance,
            zone,
            south,
        } => {
            let records = read_points_csv(&input).context("Failed to read points CSV")?;
            let utm = match zone {
                Some(zone) => UtmProjection::new(zone, south)?,
                None => {
                    let first = records
                        .first()
                        .context("Points CSV has no records")?;
                    UtmProjection::for_point(first.lon, first.lat)?
                }
            };
            info!("Buffering in EPSG:{}", utm.epsg());
            let start = Instant::now();
            let params = BufferParams {
                distance,
                ..BufferParams::default()
            };
            let collection = buffer_records(&records, utm, &params)?;
            let elapsed = start.elapsed();
            write_geojson(&collection, &output).context("Failed to write GeoJSON")?;
            println!("Buffered {} point(s)", collection.len());
            done("Buffers", &output, elapsed);
        }

        Commands::Info { input } => {
            let stack = read_stack(&input)?;
            let (rows, cols) = stack.shape();
            let bounds = stack.to_raster(0)?.bounds();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {}", cols, rows);
            println!("Bands: {}", stack.band_count());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = stack.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = stack.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nBands:");
            for index in 0..stack.band_count() {
                let band = stack.to_raster(index)?;
                let stats = band.statistics();
                let label = stack.label(index).unwrap_or("");
                match (stats.min, stats.max, stats.mean) {
                    (Some(min), Some(max), Some(mean)) => println!(
                        "  {:>3}  {}  min {:.4}  max {:.4}  mean {:.4}",
                        index + 1,
                        label,
                        min,
                        max,
                        mean
                    ),
                    _ => println!("  {:>3}  {}  (no valid cells)", index + 1, label),
                }
            }
        }
    }

    Ok(())
}
