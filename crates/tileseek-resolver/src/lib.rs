//! # tileseek-resolver
//!
//! Finds the point-cloud tiles whose footprint covers a point.
//!
//! ## Overview
//!
//! Resolution is a four-stage pipeline:
//!
//! 1. The USGS spatial index is asked which project catalogs intersect the point.
//! 2. Each catalog's metadata listing is scanned for FGDC descriptor links.
//! 3. Descriptors are fetched in batches with bounded concurrency and parsed
//!    into a bounding box and a data link.
//! 4. Tiles whose box contains the point are returned.
//!
//! Only the index query can fail a resolution. Unreachable catalogs and
//! broken descriptors are logged, counted and skipped.
//!
//! ## Example
//!
//! ```no_run
//! use tileseek_geo::Point;
//! use tileseek_resolver::{ResolutionEngine, ResolverConfig};
//!
//! # async fn run() -> Result<(), tileseek_resolver::ResolveError> {
//! let config = ResolverConfig::default();
//! let engine = ResolutionEngine::from_config(&config)?;
//!
//! // Web Mercator, the index's native system
//! let point = Point::new(-9_179_527.2, 4_870_037.0, tileseek_geo::Crs::WEB_MERCATOR);
//! let result = engine.resolve(point).await?;
//! for link in result.data_links() {
//!     println!("{link}");
//! }
//! # Ok(())
//! # }
//! ```

mod catalog;
pub mod config;
mod descriptor;
mod engine;
pub mod error;
mod index;
mod transport;

pub use catalog::{CatalogCrawler, CatalogReference};
pub use config::{
    ResolverConfig, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_INDEX_ENDPOINT, DEFAULT_LINK_FIELD, DEFAULT_METADATA_SUBPATH,
};
pub use descriptor::{DataLink, Descriptor, DescriptorReference};
pub use engine::{
    plan_batches, Progress, ProgressCallback, ResolutionEngine, ResolutionResult, ResolutionState,
    ResolutionStats, TileMatch,
};
pub use error::{ConfigError, DescriptorError, FetchError, IndexQueryError, ResolveError};
pub use index::SpatialIndexClient;
pub use transport::{fetch_with_timeout, Fetcher, ReqwestSession, ReqwestTransport, Transport};

/// Re-exported so callers can build `Url`s without a direct dependency.
pub use reqwest::Url;
