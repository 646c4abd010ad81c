//! Point buffering pipeline
//!
//! Reads tabular point records (longitude/latitude plus attributes),
//! projects them to a UTM zone, buffers each point by a linear distance in
//! meters, and returns WGS84 polygon features ready for GeoJSON output.

use geo::{LineString, Point, Polygon};
use seasonwatch_core::vector::{AttributeValue, Feature, FeatureCollection};
use seasonwatch_core::{Error, Result, UtmProjection};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One tabular point: WGS84 coordinates plus remaining columns
#[derive(Debug, Clone)]
pub struct PointRecord {
    pub lon: f64,
    pub lat: f64,
    pub attributes: BTreeMap<String, String>,
}

/// Parameters for buffer generation
#[derive(Debug, Clone)]
pub struct BufferParams {
    /// Buffer radius in meters
    pub distance: f64,
    /// Number of segments approximating the circle
    pub segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 2500.0,
            segments: 32,
        }
    }
}

/// Read point records from a CSV file with `Longitude`/`Latitude` columns.
///
/// All other columns are carried as attributes.
pub fn read_points_csv<P: AsRef<Path>>(path: P) -> Result<Vec<PointRecord>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_points_from(file)
}

/// Read point records from any CSV reader
pub fn read_points_from<R: Read>(reader: R) -> Result<Vec<PointRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| Error::Other(format!("CSV header error: {}", e)))?
        .clone();

    let lon_col = find_column(&headers, "Longitude")?;
    let lat_col = find_column(&headers, "Latitude")?;

    let mut records = Vec::new();
    for (line, row) in csv_reader.records().enumerate() {
        let row = row.map_err(|e| Error::Other(format!("CSV record error: {}", e)))?;

        let lon = parse_coord(&row, lon_col, line, "Longitude")?;
        let lat = parse_coord(&row, lat_col, line, "Latitude")?;

        let mut attributes = BTreeMap::new();
        for (index, value) in row.iter().enumerate() {
            if index == lon_col || index == lat_col {
                continue;
            }
            if let Some(name) = headers.get(index) {
                attributes.insert(name.to_string(), value.to_string());
            }
        }

        records.push(PointRecord {
            lon,
            lat,
            attributes,
        });
    }

    info!(points = records.len(), "read point records");
    Ok(records)
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::Other(format!("CSV is missing a {:?} column", name)))
}

fn parse_coord(
    row: &csv::StringRecord,
    column: usize,
    line: usize,
    name: &'static str,
) -> Result<f64> {
    row.get(column)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or(Error::InvalidRange {
            what: name,
            value: format!("row {}", line + 1),
            bounds: "a decimal degree value".to_string(),
        })
}

/// Circle polygon approximating a buffer around a projected point
pub fn buffer_point(center: &Point<f64>, params: &BufferParams) -> Polygon<f64> {
    let n = params.segments.max(4);
    let r = params.distance.abs();
    let cx = center.x();
    let cy = center.y();

    let mut coords = Vec::with_capacity(n + 1);
    for i in 0..n {
        let angle = 2.0 * PI * i as f64 / n as f64;
        coords.push((cx + r * angle.cos(), cy + r * angle.sin()));
    }
    // Close the ring
    coords.push(coords[0]);

    Polygon::new(LineString::from(coords), vec![])
}

/// Buffer every record by `params.distance` meters.
///
/// Points are projected into the given UTM zone, buffered there, and the
/// ring vertices are unprojected back to WGS84. Attribute values that
/// parse as numbers are written as numbers.
pub fn buffer_records(
    records: &[PointRecord],
    utm: UtmProjection,
    params: &BufferParams,
) -> Result<FeatureCollection> {
    if records.is_empty() {
        return Err(Error::EmptyInput("no point records to buffer"));
    }

    let mut collection = FeatureCollection::new();

    for record in records {
        let (easting, northing) = utm.forward(record.lon, record.lat);
        let circle = buffer_point(&Point::new(easting, northing), params);

        let ring: Vec<(f64, f64)> = circle
            .exterior()
            .coords()
            .map(|c| utm.inverse(c.x, c.y))
            .collect();
        let polygon = Polygon::new(LineString::from(ring), vec![]);

        let mut feature = Feature::new(polygon.into());
        for (key, value) in &record.attributes {
            feature.set_property(key.clone(), parse_attribute(value));
        }
        collection.push(feature);
    }

    info!(
        features = collection.len(),
        distance_m = params.distance,
        zone = utm.zone(),
        "buffered point records"
    );
    Ok(collection)
}

fn parse_attribute(value: &str) -> AttributeValue {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return AttributeValue::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return AttributeValue::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return AttributeValue::Float(f);
    }
    AttributeValue::String(trimmed.to_string())
}
