//! # tileseek-geo
//!
//! Geometry primitives used by the tile resolver.
//!
//! - [`Point`] and [`BoundingBox`] carry an explicit [`Crs`] so that callers
//!   never compare coordinates from different reference systems by accident.
//! - [`contains`] is the closed-box containment test used to decide whether a
//!   tile covers a query point.
//! - [`Reproject`] is the seam for coordinate transforms. [`WebMercator`]
//!   implements the only pair the USGS index needs: WGS84 (EPSG:4326) to and
//!   from spherical Web Mercator (EPSG:3857).
//!
//! ## Example
//!
//! ```
//! use tileseek_geo::{contains, BoundingBox, Crs, Point, Reproject, WebMercator};
//!
//! let gps = Point::new(-82.461096, 40.028172, Crs::WGS84);
//! let tile = BoundingBox::new(-82.5, -82.4, 40.1, 40.0, Crs::WGS84);
//! assert!(contains(&gps, &tile));
//!
//! let projected = WebMercator.reproject(gps, Crs::WEB_MERCATOR)?;
//! assert_eq!(projected.crs, Crs::WEB_MERCATOR);
//! # Ok::<(), tileseek_geo::GeoError>(())
//! ```

mod bbox;
mod crs;
mod error;
mod mercator;

pub use bbox::{contains, BoundingBox};
pub use crs::{Crs, Point};
pub use error::GeoError;
pub use mercator::{Reproject, WebMercator, EARTH_RADIUS_M, MAX_MERCATOR_LAT};

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeoError>;
