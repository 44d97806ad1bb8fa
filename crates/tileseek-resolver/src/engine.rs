//! Resolution engine: point → candidate catalogs → descriptors → matching tiles.
//!
//! The engine runs four stages in order:
//!
//! 1. [`ResolutionState::CollectingCandidates`]: one spatial index query. Its
//!    failure is the only fatal error of a resolution.
//! 2. [`ResolutionState::CrawlingCatalogs`]: every catalog page is scanned for
//!    descriptor links. A catalog that cannot be fetched contributes nothing.
//! 3. [`ResolutionState::ResolvingDescriptors`]: descriptors are fetched,
//!    parsed and tested in batches. Each batch gets its own HTTP session and
//!    at most `concurrency_limit` requests in flight; the next batch starts
//!    only after every task of the previous one has settled.
//! 4. [`ResolutionState::Done`]: matches from all batches are returned.
//!
//! Match order follows task completion and is not stable between runs.

use crate::catalog::{CatalogCrawler, CatalogReference};
use crate::config::ResolverConfig;
use crate::descriptor::{DataLink, Descriptor, DescriptorReference};
use crate::error::{ConfigError, DescriptorError, FetchError, IndexQueryError, ResolveError};
use crate::index::SpatialIndexClient;
use crate::transport::{fetch_with_timeout, ReqwestTransport, Transport};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tileseek_geo::{Point, Reproject, WebMercator};
use tileseek_metrics::{metric_defs, metrics};
use tracing::{debug, info, warn};

/// Stage of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Querying the spatial index.
    CollectingCandidates,
    /// Scanning catalog pages for descriptor links.
    CrawlingCatalogs,
    /// Fetching and testing descriptors.
    ResolvingDescriptors,
    /// Finished.
    Done,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionState::CollectingCandidates => "collecting candidates",
            ResolutionState::CrawlingCatalogs => "crawling catalogs",
            ResolutionState::ResolvingDescriptors => "resolving descriptors",
            ResolutionState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Progress notification passed to a [`ProgressCallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The engine entered a new stage.
    StateChanged(ResolutionState),
    /// The index returned this many candidate catalogs.
    CatalogsFound(usize),
    /// Catalog crawling discovered this many descriptor links.
    DescriptorsFound(usize),
    /// A batch is about to start.
    BatchStarted {
        /// Zero-based batch index.
        index: usize,
        /// Total batch count.
        total: usize,
        /// Descriptors in this batch.
        size: usize,
    },
    /// Every task of a batch has settled.
    BatchFinished {
        /// Zero-based batch index.
        index: usize,
        /// Total batch count.
        total: usize,
        /// Matches found in this batch.
        matches: usize,
    },
}

/// Callback for resolution progress.
pub type ProgressCallback = Box<dyn Fn(&Progress) + Send + Sync>;

/// A tile covering the query point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMatch {
    /// Descriptor the match was read from.
    pub descriptor: DescriptorReference,
    /// The tile's data file.
    pub data_link: DataLink,
}

/// Counters for one resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Candidate catalogs returned by the index.
    pub catalogs: usize,
    /// Catalogs whose page could not be fetched.
    pub catalogs_failed: usize,
    /// Descriptor links discovered.
    pub descriptors: usize,
    /// Batches run.
    pub batches: usize,
    /// Descriptors fetched successfully.
    pub descriptors_fetched: usize,
    /// Descriptors that could not be fetched.
    pub fetch_failures: usize,
    /// Descriptors that could not be parsed or compared.
    pub parse_failures: usize,
    /// Descriptors whose box contains the point.
    pub matches: usize,
}

/// Output of [`ResolutionEngine::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    /// Matching tiles, in completion order.
    pub matches: Vec<TileMatch>,
    /// Counters for the run.
    pub stats: ResolutionStats,
}

impl ResolutionResult {
    /// Data links of every matching tile.
    pub fn data_links(&self) -> impl Iterator<Item = &DataLink> {
        self.matches.iter().map(|m| &m.data_link)
    }

    /// No tile covers the point.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of matching tiles.
    pub fn len(&self) -> usize {
        self.matches.len()
    }
}

/// Outcome of one descriptor task.
enum TaskOutcome {
    Matched(TileMatch),
    Outside,
    FetchFailed,
    ParseFailed,
}

/// Split `total` items into consecutive ranges of at most `batch_size`.
///
/// Zero items yield zero batches.
pub fn plan_batches(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

fn emit(callback: Option<&ProgressCallback>, progress: Progress) {
    if let Some(cb) = callback {
        cb(&progress);
    }
}

/// Resolves the tiles covering a point.
///
/// Generic over the [`Transport`] so tests can substitute an in-memory
/// double; [`ResolutionEngine::from_config`] builds the `reqwest` variant.
pub struct ResolutionEngine<T: Transport> {
    transport: T,
    index: SpatialIndexClient,
    crawler: CatalogCrawler,
    reprojector: Arc<dyn Reproject>,
    batch_size: usize,
    concurrency_limit: usize,
    fetch_timeout: Duration,
}

impl<T: Transport> fmt::Debug for ResolutionEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("index", &self.index)
            .field("batch_size", &self.batch_size)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

impl ResolutionEngine<ReqwestTransport> {
    /// Create an engine that talks HTTP with `reqwest`.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ConfigError> {
        Self::new(config, ReqwestTransport::from_config(config))
    }
}

impl<T: Transport> ResolutionEngine<T> {
    /// Create an engine over `transport`. The configuration is validated.
    pub fn new(config: &ResolverConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transport,
            index: SpatialIndexClient::from_config(config)?,
            crawler: CatalogCrawler::new(config.metadata_subpath.clone(), config.fetch_timeout()),
            reprojector: Arc::new(WebMercator),
            batch_size: config.batch_size,
            concurrency_limit: config.concurrency_limit,
            fetch_timeout: config.fetch_timeout(),
        })
    }

    /// Replace the coordinate transform (Web Mercator by default).
    pub fn with_reprojector(mut self, reprojector: impl Reproject + 'static) -> Self {
        self.reprojector = Arc::new(reprojector);
        self
    }

    /// Maximum descriptors per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Maximum requests in flight.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Resolve the tiles covering `point`.
    pub async fn resolve(&self, point: Point) -> Result<ResolutionResult, ResolveError> {
        self.resolve_with_callback(point, None).await
    }

    /// Resolve the tiles covering `point`, reporting progress to `callback`.
    ///
    /// # Errors
    /// Only a failed index query is an error. Catalog and descriptor failures
    /// are logged and counted in [`ResolutionStats`].
    pub async fn resolve_with_callback(
        &self,
        point: Point,
        callback: Option<&ProgressCallback>,
    ) -> Result<ResolutionResult, ResolveError> {
        let mut stats = ResolutionStats::default();

        self.enter(ResolutionState::CollectingCandidates, callback);
        let catalogs = self.collect_candidates(&point).await?;
        stats.catalogs = catalogs.len();
        info!(point = %point, catalogs = catalogs.len(), "Spatial index returned candidate catalogs");
        emit(callback, Progress::CatalogsFound(catalogs.len()));

        self.enter(ResolutionState::CrawlingCatalogs, callback);
        let descriptors = self.crawl_catalogs(&catalogs, &mut stats).await;
        stats.descriptors = descriptors.len();
        info!(descriptors = descriptors.len(), "Total descriptor links found");
        emit(callback, Progress::DescriptorsFound(descriptors.len()));

        self.enter(ResolutionState::ResolvingDescriptors, callback);
        let batches = plan_batches(descriptors.len(), self.batch_size);
        let total = batches.len();
        let mut matches = Vec::new();

        for (index, range) in batches.into_iter().enumerate() {
            let batch = &descriptors[range.clone()];
            info!(batch = index, total, start = range.start, end = range.end, "Processing batch");
            emit(callback, Progress::BatchStarted { index, total, size: batch.len() });

            let started = Instant::now();
            let outcomes = self.run_batch(batch, &point).await;
            metrics::histogram!(metric_defs::BATCH_DURATION.name).record(started.elapsed().as_secs_f64());

            let before = matches.len();
            for outcome in outcomes {
                match outcome {
                    TaskOutcome::Matched(tile) => {
                        stats.descriptors_fetched += 1;
                        matches.push(tile);
                    }
                    TaskOutcome::Outside => stats.descriptors_fetched += 1,
                    TaskOutcome::ParseFailed => {
                        stats.descriptors_fetched += 1;
                        stats.parse_failures += 1;
                    }
                    TaskOutcome::FetchFailed => stats.fetch_failures += 1,
                }
            }
            stats.batches += 1;

            let found = matches.len() - before;
            debug!(batch = index, matches = found, elapsed = ?started.elapsed(), "Batch settled");
            emit(callback, Progress::BatchFinished { index, total, matches: found });
        }

        stats.matches = matches.len();
        self.enter(ResolutionState::Done, callback);
        info!(
            matches = stats.matches,
            fetch_failures = stats.fetch_failures,
            parse_failures = stats.parse_failures,
            "Resolution complete"
        );

        Ok(ResolutionResult { matches, stats })
    }

    fn enter(&self, state: ResolutionState, callback: Option<&ProgressCallback>) {
        debug!(%state, "Entering state");
        emit(callback, Progress::StateChanged(state));
    }

    async fn collect_candidates(&self, point: &Point) -> Result<Vec<CatalogReference>, IndexQueryError> {
        let result = self.query_index(point).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(metric_defs::INDEX_QUERIES.name, "outcome" => outcome).increment(1);
        result
    }

    async fn query_index(&self, point: &Point) -> Result<Vec<CatalogReference>, IndexQueryError> {
        let index_point = self.reprojector.reproject(*point, self.index.crs())?;
        let session = self.transport.open_session()?;
        self.index.query_candidates(&session, &index_point).await
    }

    async fn crawl_catalogs(
        &self,
        catalogs: &[CatalogReference],
        stats: &mut ResolutionStats,
    ) -> Vec<DescriptorReference> {
        if catalogs.is_empty() {
            return Vec::new();
        }

        let session = match self.transport.open_session() {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "Cannot open a session for catalog crawling");
                stats.catalogs_failed = catalogs.len();
                metrics::counter!(metric_defs::CATALOG_FAILURES.name).increment(catalogs.len() as u64);
                return Vec::new();
            }
        };

        // `buffered` keeps catalog order while crawling concurrently
        let pages: Vec<_> = stream::iter(catalogs)
            .map(|catalog| {
                let session = &session;
                async move { (catalog, self.crawler.discover(session, catalog).await) }
            })
            .buffered(self.concurrency_limit)
            .collect()
            .await;

        let mut descriptors = Vec::new();
        for (catalog, page) in pages {
            match page {
                Ok(links) => {
                    metrics::counter!(metric_defs::CATALOGS_CRAWLED.name).increment(1);
                    metrics::counter!(metric_defs::DESCRIPTORS_DISCOVERED.name).increment(links.len() as u64);
                    descriptors.extend(links);
                }
                Err(err) => {
                    warn!(catalog = %catalog, error = %err, "Catalog fetch failed, skipping");
                    metrics::counter!(metric_defs::CATALOG_FAILURES.name).increment(1);
                    stats.catalogs_failed += 1;
                }
            }
        }
        descriptors
    }

    async fn run_batch(&self, batch: &[DescriptorReference], point: &Point) -> Vec<TaskOutcome> {
        let session = match self.transport.open_session() {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, size = batch.len(), "Cannot open a session for batch");
                metrics::counter!(metric_defs::DESCRIPTOR_FETCH_FAILURES.name, "reason" => err.reason())
                    .increment(batch.len() as u64);
                return batch.iter().map(|_| TaskOutcome::FetchFailed).collect();
            }
        };

        metrics::gauge!(metric_defs::BATCH_SIZE.name).set(batch.len() as f64);
        let outcomes: Vec<TaskOutcome> = stream::iter(batch)
            .map(|reference| self.resolve_descriptor(&session, reference, point))
            .buffer_unordered(self.concurrency_limit)
            .collect()
            .await;
        metrics::gauge!(metric_defs::BATCH_SIZE.name).set(0.0);

        // The batch's connection pool is released here
        drop(session);
        outcomes
    }

    async fn resolve_descriptor(
        &self,
        session: &T::Session,
        reference: &DescriptorReference,
        point: &Point,
    ) -> TaskOutcome {
        let body = match fetch_with_timeout(session, reference.url(), self.fetch_timeout).await {
            Ok(body) => body,
            Err(err) => {
                self.record_fetch_failure(reference, &err);
                return TaskOutcome::FetchFailed;
            }
        };
        metrics::counter!(metric_defs::DESCRIPTORS_FETCHED.name).increment(1);

        let descriptor = match Descriptor::parse(&body) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.record_parse_failure(reference, &err);
                return TaskOutcome::ParseFailed;
            }
        };

        match self.covers(&descriptor, point) {
            Ok(true) => {
                info!(descriptor = %reference, data_link = %descriptor.data_link, "Point is within tile boundary");
                metrics::counter!(metric_defs::DESCRIPTOR_MATCHES.name).increment(1);
                TaskOutcome::Matched(TileMatch {
                    descriptor: reference.clone(),
                    data_link: descriptor.data_link,
                })
            }
            Ok(false) => TaskOutcome::Outside,
            Err(err) => {
                self.record_parse_failure(reference, &err);
                TaskOutcome::ParseFailed
            }
        }
    }

    /// Containment test in the descriptor's reference system.
    fn covers(&self, descriptor: &Descriptor, point: &Point) -> Result<bool, DescriptorError> {
        let bbox = &descriptor.bbox;
        if !bbox.is_well_formed() {
            debug!(?bbox, "Bounding box is not well formed, treating as non-containing");
            return Ok(false);
        }

        let point = if point.crs == bbox.crs {
            *point
        } else {
            self.reprojector
                .reproject(*point, bbox.crs)
                .map_err(|_| DescriptorError::CrsMismatch {
                    point: point.crs,
                    bbox: bbox.crs,
                })?
        };

        Ok(bbox.contains(&point))
    }

    fn record_fetch_failure(&self, reference: &DescriptorReference, err: &FetchError) {
        warn!(descriptor = %reference, error = %err, "Descriptor fetch failed");
        metrics::counter!(metric_defs::DESCRIPTOR_FETCH_FAILURES.name, "reason" => err.reason()).increment(1);
    }

    fn record_parse_failure(&self, reference: &DescriptorReference, err: &DescriptorError) {
        warn!(descriptor = %reference, error = %err, "Descriptor rejected");
        metrics::counter!(metric_defs::DESCRIPTOR_PARSE_FAILURES.name, "reason" => err.reason()).increment(1);
    }
}
