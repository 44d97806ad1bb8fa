//! Resolver configuration.
//!
//! All fields have defaults targeting the USGS 3DEP lidar index, so an empty
//! YAML document is a valid configuration:
//!
//! ```yaml
//! index_endpoint: https://index.nationalmap.gov/arcgis/rest/services/3DEPElevationIndex/MapServer/24/query
//! index_wkid: 3857
//! link_field: lpc_link
//! metadata_subpath: metadata
//! batch_size: 2000
//! concurrency_limit: 256
//! fetch_timeout_secs: 60
//! ```

use crate::error::ConfigError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tileseek_geo::Crs;

/// USGS 3DEP elevation index, lidar point cloud (LPC) project layer.
pub const DEFAULT_INDEX_ENDPOINT: &str =
    "https://index.nationalmap.gov/arcgis/rest/services/3DEPElevationIndex/MapServer/24/query";

/// Attribute of an index feature holding the project base URL.
pub const DEFAULT_LINK_FIELD: &str = "lpc_link";

/// Sub-path under a project holding the per-tile metadata documents.
pub const DEFAULT_METADATA_SUBPATH: &str = "metadata";

/// Maximum number of descriptor tasks per batch.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Maximum number of requests in flight within a batch.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 256;

/// Per-fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Configuration for a [`ResolutionEngine`](crate::ResolutionEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// ArcGIS REST `query` endpoint of the spatial index layer.
    pub index_endpoint: String,
    /// EPSG code the index expects for the query geometry (`inSR`/`outSR`).
    pub index_wkid: u32,
    /// Feature attribute holding the catalog base URL.
    pub link_field: String,
    /// Sub-path joined to catalog URLs and descriptor links.
    pub metadata_subpath: String,
    /// Maximum descriptor tasks per batch.
    pub batch_size: usize,
    /// Maximum requests in flight at once.
    pub concurrency_limit: usize,
    /// Per-fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            index_endpoint: DEFAULT_INDEX_ENDPOINT.to_string(),
            index_wkid: Crs::WEB_MERCATOR.epsg(),
            link_field: DEFAULT_LINK_FIELD.to_string(),
            metadata_subpath: DEFAULT_METADATA_SUBPATH.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: format!("tileseek/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ResolverConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map
        let config: ResolverConfig = if yaml.trim().is_empty() {
            ResolverConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::Invalid(
                "concurrency_limit must be at least 1".into(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch_timeout_secs must be at least 1".into(),
            ));
        }
        if self.link_field.is_empty() {
            return Err(ConfigError::Invalid("link_field must not be empty".into()));
        }
        if self.metadata_subpath.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid(
                "metadata_subpath must not be empty".into(),
            ));
        }
        self.endpoint_url()?;
        Ok(())
    }

    /// The index endpoint as a parsed URL.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.index_endpoint).map_err(|e| {
            ConfigError::Invalid(format!(
                "index_endpoint '{}' is not a valid URL: {}",
                self.index_endpoint, e
            ))
        })
    }

    /// Reference system of the index query geometry.
    pub fn index_crs(&self) -> Crs {
        Crs(self.index_wkid)
    }

    /// Per-fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResolverConfig::default();
        config.validate().unwrap();
        assert_eq!(config.batch_size, 2000);
        assert_eq!(config.index_crs(), Crs::WEB_MERCATOR);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(60));
        assert!(config.user_agent.starts_with("tileseek/"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ResolverConfig::from_yaml_str("").unwrap(), ResolverConfig::default());
        assert_eq!(ResolverConfig::from_yaml_str("  \n").unwrap(), ResolverConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ResolverConfig::from_yaml_str("batch_size: 500\nconcurrency_limit: 32\n").unwrap();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.concurrency_limit, 32);
        assert_eq!(config.link_field, DEFAULT_LINK_FIELD);
        assert_eq!(config.index_endpoint, DEFAULT_INDEX_ENDPOINT);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ResolverConfig::from_yaml_str("batch_sise: 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_zero_values_rejected() {
        for yaml in ["batch_size: 0", "concurrency_limit: 0", "fetch_timeout_secs: 0"] {
            let err = ResolverConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{} should be rejected", yaml);
        }
    }

    #[test]
    fn test_empty_metadata_subpath_rejected() {
        for yaml in ["metadata_subpath: ''", "metadata_subpath: /"] {
            let err = ResolverConfig::from_yaml_str(yaml).unwrap_err();
            assert!(err.to_string().contains("metadata_subpath"), "{} should be rejected", yaml);
        }
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let err = ResolverConfig::from_yaml_str("index_endpoint: not a url").unwrap_err();
        assert!(err.to_string().contains("index_endpoint"));
    }
}
