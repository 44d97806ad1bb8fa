//! Coordinate transforms between WGS84 and spherical Web Mercator.
//!
//! Web Mercator (EPSG:3857) projects the WGS84 ellipsoid coordinates onto a
//! sphere of radius [`EARTH_RADIUS_M`]:
//! - x = R * lon
//! - y = R * ln(tan(π/4 + lat/2))
//!
//! Latitudes beyond ±[`MAX_MERCATOR_LAT`] are clamped, matching the square
//! world extent used by web map tiling.

use crate::{Crs, GeoError, Point, Result};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Semi-major axis of WGS84, used as the Web Mercator sphere radius.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// The latitude limit of Web Mercator (arctan(sinh(π))).
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A pure coordinate transform.
///
/// Implementations must return a point expressed in `to`, or fail when the
/// pair of reference systems is not supported.
pub trait Reproject: Send + Sync {
    /// Transform `point` into the reference system `to`.
    fn reproject(&self, point: Point, to: Crs) -> Result<Point>;
}

/// Closed-form WGS84 <-> Web Mercator projector.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl WebMercator {
    /// Project WGS84 longitude/latitude degrees into Web Mercator meters.
    pub fn forward(lon: f64, lat: f64) -> (f64, f64) {
        let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let x = EARTH_RADIUS_M * lon.to_radians();
        let y = EARTH_RADIUS_M * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    /// Inverse of [`forward`](Self::forward).
    pub fn inverse(x: f64, y: f64) -> (f64, f64) {
        let lon = (x / EARTH_RADIUS_M).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
        (lon, lat)
    }
}

impl Reproject for WebMercator {
    fn reproject(&self, point: Point, to: Crs) -> Result<Point> {
        if !point.is_finite() {
            return Err(GeoError::NonFinite {
                x: point.x,
                y: point.y,
            });
        }

        match (point.crs, to) {
            (from, to) if from == to => Ok(point),
            (Crs::WGS84, Crs::WEB_MERCATOR) => {
                let (x, y) = Self::forward(point.x, point.y);
                Ok(Point::new(x, y, to))
            }
            (Crs::WEB_MERCATOR, Crs::WGS84) => {
                let (x, y) = Self::inverse(point.x, point.y);
                Ok(Point::new(x, y, to))
            }
            (from, to) => Err(GeoError::UnsupportedTransform { from, to }),
        }
    }
}
