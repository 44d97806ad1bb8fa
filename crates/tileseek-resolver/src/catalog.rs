//! Catalog crawling: discover descriptor documents listed on a project's
//! metadata page.

use crate::descriptor::DescriptorReference;
use crate::error::FetchError;
use crate::transport::{fetch_with_timeout, Fetcher};
use reqwest::Url;
use scraper::{ElementRef, Html};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Substring marking an anchor target as a metadata document.
const DESCRIPTOR_MARKER: &str = ".xml";

/// URL of a project metadata listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogReference(Url);

impl CatalogReference {
    /// Wrap a catalog URL.
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    /// The catalog URL.
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// The catalog URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CatalogReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Discovers descriptor links on catalog pages.
#[derive(Debug, Clone)]
pub struct CatalogCrawler {
    metadata_subpath: String,
    fetch_timeout: Duration,
}

impl CatalogCrawler {
    /// Create a crawler that resolves links under `metadata_subpath`.
    pub fn new(metadata_subpath: impl Into<String>, fetch_timeout: Duration) -> Self {
        Self {
            metadata_subpath: metadata_subpath.into(),
            fetch_timeout,
        }
    }

    /// Fetch a catalog page and return every descriptor it links to, in
    /// document order. Duplicates are kept.
    pub async fn discover<F: Fetcher + ?Sized>(
        &self,
        fetcher: &F,
        catalog: &CatalogReference,
    ) -> Result<Vec<DescriptorReference>, FetchError> {
        let html = fetch_with_timeout(fetcher, catalog.url(), self.fetch_timeout).await?;
        let links = self.extract_links(catalog, &html);
        debug!(catalog = %catalog, links = links.len(), "Scanned catalog page");
        Ok(links)
    }

    /// Extract descriptor links from catalog markup.
    ///
    /// Every anchor whose `href` contains `.xml` is prefixed with the metadata
    /// sub-path and resolved against the catalog URL, so a listing served at
    /// `.../project/metadata` linking `tile.xml` yields
    /// `.../project/metadata/tile.xml`.
    pub fn extract_links(&self, catalog: &CatalogReference, html: &str) -> Vec<DescriptorReference> {
        let document = Html::parse_document(html);

        document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| element.value().name() == "a")
            .filter_map(|element| element.value().attr("href"))
            .filter(|href| href.contains(DESCRIPTOR_MARKER))
            .filter_map(|href| {
                let relative = format!("{}/{}", self.metadata_subpath, href);
                match catalog.url().join(&relative) {
                    Ok(url) => Some(DescriptorReference::new(url)),
                    Err(e) => {
                        warn!(catalog = %catalog, href, error = %e, "Skipping unresolvable descriptor link");
                        None
                    }
                }
            })
            .collect()
    }
}
