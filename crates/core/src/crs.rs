//! Coordinate reference system handling

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::error::{Error, Result};

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation if available
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Parse an `"EPSG:xxxx"` authority string
    pub fn from_authority(s: &str) -> Result<Self> {
        let code = s
            .strip_prefix("EPSG:")
            .or_else(|| s.strip_prefix("epsg:"))
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| Error::InvalidRange {
                what: "crs",
                value: s.to_string(),
                bounds: "EPSG:<code>".to_string(),
            })?;
        Ok(Self::from_epsg(code))
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => write!(f, "EPSG:{}", code),
            (None, Some(_)) => write!(f, "WKT(custom)"),
            (None, None) => write!(f, "unknown"),
        }
    }
}

// WGS84 ellipsoid
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Transverse-Mercator projection for one UTM zone on the WGS84 ellipsoid.
///
/// Projects geographic WGS84 coordinates into UTM meters and back; used to
/// buffer point geometries by a linear distance before returning to WGS84.
/// Accuracy of the series expansion is sub-millimeter within a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmProjection {
    zone: u8,
    south: bool,
}

impl UtmProjection {
    /// Create a projection for a UTM zone (1..=60)
    pub fn new(zone: u8, south: bool) -> Result<Self> {
        if !(1..=60).contains(&zone) {
            return Err(Error::InvalidRange {
                what: "utm_zone",
                value: zone.to_string(),
                bounds: "1..=60".to_string(),
            });
        }
        Ok(Self { zone, south })
    }

    /// Pick the zone containing a lon/lat point
    pub fn for_point(lon: f64, lat: f64) -> Result<Self> {
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
        Self::new(zone, lat < 0.0)
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn is_south(&self) -> bool {
        self.south
    }

    /// EPSG code of this zone (326xx north, 327xx south)
    pub fn epsg(&self) -> u32 {
        if self.south {
            32700 + self.zone as u32
        } else {
            32600 + self.zone as u32
        }
    }

    pub fn crs(&self) -> CRS {
        CRS::from_epsg(self.epsg())
    }

    fn central_meridian(&self) -> f64 {
        ((self.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
    }

    /// Project lon/lat degrees to (easting, northing) meters
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let dlam = lon.to_radians() - self.central_meridian();

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlam;

        let m = meridian_arc(phi, e2);

        let easting = UTM_K0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + UTM_FALSE_EASTING;

        let mut northing = UTM_K0
            * (m + n
                * tan_phi
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

        if self.south {
            northing += UTM_FALSE_NORTHING_SOUTH;
        }

        (easting, northing)
    }

    /// Unproject (easting, northing) meters back to lon/lat degrees
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let ep2 = e2 / (1.0 - e2);

        let x = easting - UTM_FALSE_EASTING;
        let y = if self.south {
            northing - UTM_FALSE_NORTHING_SOUTH
        } else {
            northing
        };

        let m = y / UTM_K0;
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let mu = m
            / (WGS84_A
                * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2.powi(3) / 256.0));

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let c1 = ep2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let n1 = WGS84_A / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
        let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
        let d = x / (n1 * UTM_K0);

        let phi = phi1
            - (n1 * tan_phi1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lam = self.central_meridian()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos_phi1;

        (lam * 180.0 / PI, phi * 180.0 / PI)
    }
}

/// Meridian arc length from the equator to latitude `phi`
fn meridian_arc(phi: f64, e2: f64) -> f64 {
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2.powi(3) / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e2 * e2 / 32.0 + 45.0 * e2.powi(3) / 1024.0)
                * (2.0 * phi).sin()
            + (15.0 * e2 * e2 / 256.0 + 45.0 * e2.powi(3) / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e2.powi(3) / 3072.0) * (6.0 * phi).sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_crs_display_and_authority() {
        let crs = CRS::from_authority("EPSG:32736").unwrap();
        assert_eq!(crs.epsg(), Some(32736));
        assert_eq!(crs.to_string(), "EPSG:32736");
        assert!(CRS::from_authority("utm36s").is_err());
    }

    #[test]
    fn test_utm_zone_epsg() {
        let north = UtmProjection::new(36, false).unwrap();
        let south = UtmProjection::new(36, true).unwrap();
        assert_eq!(north.epsg(), 32636);
        assert_eq!(south.epsg(), 32736);
        assert!(UtmProjection::new(0, false).is_err());
        assert!(UtmProjection::new(61, true).is_err());
    }

    #[test]
    fn test_zone_for_point() {
        // Lake Victoria region falls in zone 36
        let utm = UtmProjection::for_point(34.75, -0.1).unwrap();
        assert_eq!(utm.zone(), 36);
        assert!(utm.is_south());
    }

    #[test]
    fn test_central_meridian_on_equator_is_exact() {
        // Zone 36 central meridian is 33E; projecting (33, 0) must give the
        // false easting exactly and zero northing (northern convention).
        let utm = UtmProjection::new(36, false).unwrap();
        let (e, n) = utm.forward(33.0, 0.0);
        assert_relative_eq!(e, 500_000.0, epsilon = 1e-6);
        assert_relative_eq!(n, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        let utm = UtmProjection::new(36, true).unwrap();
        for &(lon, lat) in &[(34.75, -0.1), (33.5, -2.3), (35.9, -4.8), (34.0, -0.001)] {
            let (e, n) = utm.forward(lon, lat);
            let (lon2, lat2) = utm.inverse(e, n);
            assert_relative_eq!(lon, lon2, epsilon = 1e-8);
            assert_relative_eq!(lat, lat2, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_buffer_distance_scale() {
        // 0.01 degrees of longitude at the equator is ~1113 m; the projected
        // distance must agree to within the UTM scale factor distortion.
        let utm = UtmProjection::new(36, true).unwrap();
        let (e1, n1) = utm.forward(34.0, -0.05);
        let (e2, n2) = utm.forward(34.01, -0.05);
        let d = ((e2 - e1).powi(2) + (n2 - n1).powi(2)).sqrt();
        assert!((d - 1113.2).abs() < 2.0, "distance {d}");
    }
}
