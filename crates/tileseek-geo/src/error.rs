//! Error types for the geometry crate.

use crate::Crs;
use thiserror::Error;

/// Errors that can occur when transforming coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// No transform is available between the two reference systems.
    #[error("No transform available from {from} to {to}")]
    UnsupportedTransform {
        /// Source reference system.
        from: Crs,
        /// Target reference system.
        to: Crs,
    },

    /// Coordinate is not a finite number.
    #[error("Coordinate ({x}, {y}) is not finite")]
    NonFinite {
        /// X (easting / longitude).
        x: f64,
        /// Y (northing / latitude).
        y: f64,
    },
}
