//! Spatial index client for the ArcGIS REST `query` operation.
//!
//! The USGS 3DEP elevation index exposes lidar project footprints as a
//! feature layer. A point-intersects query returns one feature per project
//! covering the point, with the project's base URL in an attribute
//! (`lpc_link` by default).

use crate::catalog::CatalogReference;
use crate::config::ResolverConfig;
use crate::error::{ConfigError, IndexQueryError};
use crate::transport::{fetch_with_timeout, Fetcher};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tileseek_geo::{Crs, Point};
use tracing::{debug, warn};

/// Body of a `query` response.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Option<Vec<Feature>>,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    attributes: Map<String, Value>,
}

/// ArcGIS reports failures as `{"error": {...}}` with HTTP 200.
#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<String>,
}

/// Client for the spatial index service.
#[derive(Debug, Clone)]
pub struct SpatialIndexClient {
    endpoint: Url,
    crs: Crs,
    link_field: String,
    metadata_subpath: String,
    fetch_timeout: Duration,
}

impl SpatialIndexClient {
    /// Create a client for `endpoint`, querying with geometries in `crs`.
    pub fn new(endpoint: Url, crs: Crs) -> Self {
        Self {
            endpoint,
            crs,
            link_field: crate::config::DEFAULT_LINK_FIELD.to_string(),
            metadata_subpath: crate::config::DEFAULT_METADATA_SUBPATH.to_string(),
            fetch_timeout: Duration::from_secs(crate::config::DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Create a client from the resolver configuration.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.endpoint_url()?, config.index_crs())
            .with_link_field(config.link_field.clone())
            .with_metadata_subpath(config.metadata_subpath.clone())
            .with_fetch_timeout(config.fetch_timeout()))
    }

    /// Use a different feature attribute for the catalog base URL.
    pub fn with_link_field(mut self, link_field: impl Into<String>) -> Self {
        self.link_field = link_field.into();
        self
    }

    /// Use a different metadata sub-path.
    pub fn with_metadata_subpath(mut self, subpath: impl Into<String>) -> Self {
        self.metadata_subpath = subpath.into();
        self
    }

    /// Set the query timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Reference system the index expects query points in.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Build the point-intersects query URL.
    pub fn query_url(&self, point: &Point) -> Url {
        let geometry = json!({
            "x": point.x,
            "y": point.y,
            "spatialReference": { "wkid": self.crs.epsg() },
        });
        let wkid = self.crs.epsg().to_string();

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("f", "json")
            .append_pair("returnGeometry", "true")
            .append_pair("returnTrueCurves", "false")
            .append_pair("spatialRel", "esriSpatialRelIntersects")
            .append_pair("inSR", &wkid)
            .append_pair("outSR", &wkid)
            .append_pair("outFields", "*")
            .append_pair("geometryType", "esriGeometryPoint")
            .append_pair("geometry", &geometry.to_string());
        url
    }

    /// Query the index for catalogs whose coverage may contain `point`.
    ///
    /// `point` must already be expressed in [`crs`](Self::crs).
    pub async fn query_candidates<F: Fetcher + ?Sized>(
        &self,
        fetcher: &F,
        point: &Point,
    ) -> Result<Vec<CatalogReference>, IndexQueryError> {
        if point.crs != self.crs {
            return Err(IndexQueryError::CrsMismatch {
                expected: self.crs,
                actual: point.crs,
            });
        }

        let url = self.query_url(point);
        debug!(%url, "Querying spatial index");
        let body = fetch_with_timeout(fetcher, &url, self.fetch_timeout).await?;
        self.parse_candidates(&body)
    }

    /// Map a `query` response body to catalog references.
    ///
    /// Each feature's link attribute becomes `<link>/<metadata_subpath>`.
    /// Features without a usable link are skipped.
    pub fn parse_candidates(&self, body: &str) -> Result<Vec<CatalogReference>, IndexQueryError> {
        let response: QueryResponse = serde_json::from_str(body)?;

        if let Some(error) = response.error {
            let mut message = error.message;
            if !error.details.is_empty() {
                message = format!("{} ({})", message, error.details.join("; "));
            }
            return Err(IndexQueryError::Service {
                code: error.code,
                message,
            });
        }

        let features = response.features.ok_or_else(|| {
            IndexQueryError::Decode("response has no 'features' collection".to_string())
        })?;

        let mut catalogs = Vec::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            let Some(link) = feature.attributes.get(&self.link_field).and_then(Value::as_str) else {
                warn!(feature = i, field = %self.link_field, "Index feature has no catalog link, skipping");
                continue;
            };

            let base = link.strip_suffix('/').unwrap_or(link);
            let catalog_url = format!("{}/{}", base, self.metadata_subpath);
            match Url::parse(&catalog_url) {
                Ok(url) => catalogs.push(CatalogReference::new(url)),
                Err(e) => {
                    warn!(feature = i, link, error = %e, "Index feature has an invalid catalog link, skipping");
                }
            }
        }

        Ok(catalogs)
    }
}
