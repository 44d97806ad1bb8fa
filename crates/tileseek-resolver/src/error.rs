//! Error types for the resolver.
//!
//! Only [`IndexQueryError`] is fatal to a resolution. [`FetchError`] and
//! [`DescriptorError`] describe the failure of a single catalog or descriptor
//! and are logged and counted by the engine, never propagated.

use std::time::Duration;
use thiserror::Error;
use tileseek_geo::{Crs, GeoError};

/// Failure to retrieve one remote document.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Connection, TLS or body decoding failure.
    #[error("Request to {url} failed: {reason}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// No complete response within the per-fetch timeout.
    #[error("Request to {url} timed out after {after:?}")]
    Timeout {
        /// Requested URL.
        url: String,
        /// The timeout that expired.
        after: Duration,
    },

    /// The HTTP session (client and connection pool) could not be built.
    #[error("Failed to open HTTP session: {0}")]
    Session(String),
}

impl FetchError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Status { .. } => "status",
            FetchError::Transport { .. } => "transport",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Session(_) => "session",
        }
    }
}

/// Failure to turn a descriptor document into a [`Descriptor`](crate::Descriptor).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    /// Not well-formed XML, or a bounding coordinate is not a number.
    #[error("Malformed descriptor: {0}")]
    Malformed(String),

    /// A required element is absent or empty.
    #[error("Descriptor is missing required field '{0}'")]
    MissingField(&'static str),

    /// The query point cannot be expressed in the descriptor's reference system.
    #[error("Query point in {point} cannot be compared with a bounding box in {bbox}")]
    CrsMismatch {
        /// Reference system of the query point.
        point: Crs,
        /// Reference system of the bounding box.
        bbox: Crs,
    },
}

impl DescriptorError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DescriptorError::Malformed(_) => "malformed",
            DescriptorError::MissingField(_) => "missing_field",
            DescriptorError::CrsMismatch { .. } => "crs_mismatch",
        }
    }
}

/// Failure of the spatial index query. Aborts the resolution.
#[derive(Debug, Error)]
pub enum IndexQueryError {
    /// The index could not be reached or answered with a non-2xx status.
    #[error("Spatial index request failed: {0}")]
    Fetch(#[from] FetchError),

    /// The response body is not the expected JSON document.
    #[error("Unexpected spatial index response: {0}")]
    Decode(String),

    /// The service reported an error inside a successful response.
    #[error("Spatial index error {code}: {message}")]
    Service {
        /// ArcGIS error code.
        code: i64,
        /// ArcGIS error message, with details appended.
        message: String,
    },

    /// The query point could not be projected into the index reference system.
    #[error("Cannot project query point for the spatial index: {0}")]
    Reproject(#[from] GeoError),

    /// The point handed to the client is not in the index reference system.
    #[error("Spatial index expects {expected}, got a point in {actual}")]
    CrsMismatch {
        /// Reference system the index requires.
        expected: Crs,
        /// Reference system of the supplied point.
        actual: Crs,
    },
}

impl From<serde_json::Error> for IndexQueryError {
    fn from(err: serde_json::Error) -> Self {
        IndexQueryError::Decode(err.to_string())
    }
}

/// Invalid resolver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML syntax or type error.
    #[error("Invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors returned by [`ResolutionEngine::resolve`](crate::ResolutionEngine::resolve).
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The spatial index query failed.
    #[error(transparent)]
    IndexQuery(#[from] IndexQueryError),

    /// The engine was built from an invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
