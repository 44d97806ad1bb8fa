//! Coordinate reference systems and points.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(pub u32);

impl Crs {
    /// WGS84 geographic coordinates (longitude, latitude in degrees).
    pub const WGS84: Crs = Crs(4326);

    /// Spherical Web Mercator (meters).
    pub const WEB_MERCATOR: Crs = Crs(3857);

    /// The EPSG code, also used as the ArcGIS `wkid`.
    pub fn epsg(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// A point in a declared reference system.
///
/// For geographic systems `x` is the longitude and `y` the latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Easting or longitude.
    pub x: f64,
    /// Northing or latitude.
    pub y: f64,
    /// Reference system of `x` and `y`.
    pub crs: Crs,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64, crs: Crs) -> Self {
        Self { x, y, crs }
    }

    /// Create a WGS84 point from longitude and latitude.
    pub fn lon_lat(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, Crs::WGS84)
    }

    /// Both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}", self.x, self.y, self.crs)
    }
}
