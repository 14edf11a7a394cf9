//! Listing-page crawl: walks the paginated catalog and produces one
//! [`ListingEntry`] per distinct item.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reelcat_core::{AppConfig, ListingEntry};
use url::Url;

use crate::error::ScraperError;
use crate::normalize::{normalize_title, normalize_url};
use crate::render::{
    first_within, trimmed_inner_text, BrowserSession, ElementHandle, PageHandle, Renderer,
};

/// Item links that carry a visible title span.
pub const PRIMARY_LINK_SELECTOR: &str = "a[href*='/m/']:has(span.p--small)";
/// Any item link inside the discovery grid; used when the primary selector
/// matches nothing after a markup change.
pub const FALLBACK_LINK_SELECTOR: &str = "[data-qa='discovery-media-list'] a[href*='/m/']";
const TITLE_SELECTOR: &str = "span.p--small";

/// Column headers and score badges that share the title span's styling.
const NON_TITLE_LABELS: [&str; 4] = ["tomatometer", "audience score", "popcornmeter", "score"];

const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct ListingOptions {
    /// Prefix the page index is appended to.
    pub url_template: String,
    /// Origin relative hrefs are resolved against.
    pub origin: Url,
    pub nav_timeout: Duration,
    /// Pause after navigation so client-side rendering can populate the grid.
    pub settle: Duration,
}

impl ListingOptions {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidOrigin`] if `site_origin` is not an
    /// absolute URL.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let origin =
            Url::parse(&config.site_origin).map_err(|e| ScraperError::InvalidOrigin {
                origin: config.site_origin.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            url_template: config.listing_url_template.clone(),
            origin,
            nav_timeout: Duration::from_secs(config.list_nav_timeout_secs),
            settle: Duration::from_millis(config.list_settle_ms),
        })
    }

    #[must_use]
    pub fn page_url(&self, page: u32) -> String {
        format!("{}{page}", self.url_template)
    }
}

/// Why a candidate was or wasn't added to a [`DedupIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// The URL or the title normalized to an empty string.
    EmptyKey,
    DuplicateUrl,
    /// Same normalized title as an already accepted entry with a different URL.
    DuplicateTitle,
}

/// Accepted entries in first-seen order, indexed by normalized URL and by
/// normalized title.
///
/// Owned by a single collection run. Two distinct works whose titles
/// normalize identically collapse into the first one seen.
#[derive(Debug, Default)]
pub struct DedupIndex {
    entries: Vec<ListingEntry>,
    by_url: HashMap<String, usize>,
    by_title: HashMap<String, usize>,
}

impl DedupIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a candidate with its display `title` and already-normalized
    /// `url`, accepting it unless either key is empty or already taken.
    pub fn admit(&mut self, title: &str, url: &str) -> Admission {
        let title_key = normalize_title(title);
        if url.is_empty() || title_key.is_empty() {
            return Admission::EmptyKey;
        }
        if self.by_url.contains_key(url) {
            return Admission::DuplicateUrl;
        }
        if self.by_title.contains_key(&title_key) {
            return Admission::DuplicateTitle;
        }

        let position = self.entries.len();
        self.entries.push(ListingEntry::new(title, url));
        self.by_url.insert(url.to_owned(), position);
        self.by_title.insert(title_key, position);
        Admission::Accepted
    }

    #[cfg(test)]
    pub(crate) fn get_by_url(&self, url: &str) -> Option<&ListingEntry> {
        self.by_url.get(url).map(|&i| &self.entries[i])
    }

    #[cfg(test)]
    pub(crate) fn get_by_title(&self, title: &str) -> Option<&ListingEntry> {
        self.by_title
            .get(&normalize_title(title))
            .map(|&i| &self.entries[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<ListingEntry> {
        self.entries
    }
}

/// Crawls listing pages through one shared browsing session, one page handle
/// per listing page.
pub struct ListCollector {
    renderer: Arc<dyn Renderer>,
    options: ListingOptions,
}

impl ListCollector {
    pub fn new(renderer: Arc<dyn Renderer>, options: ListingOptions) -> Self {
        Self { renderer, options }
    }

    /// Visits `pages` in the given order and returns the deduplicated entries
    /// in first-seen order.
    ///
    /// A page that fails to load is logged and skipped; a candidate that
    /// fails to read is skipped without affecting the rest of its page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserLaunch`] only when the rendering engine
    /// cannot be started at all.
    pub async fn collect(
        &self,
        pages: impl IntoIterator<Item = u32>,
    ) -> Result<Vec<ListingEntry>, ScraperError> {
        tracing::info!("starting listing crawl with deduplication");
        let session = self.renderer.launch().await?;
        let mut index = DedupIndex::new();

        for page in pages {
            if let Err(e) = self.collect_page(session.as_ref(), page, &mut index).await {
                tracing::warn!(page, error = %e, "skipping listing page");
            }
        }

        session.close().await;

        tracing::info!(unique = index.len(), "listing crawl complete");
        for entry in index.entries().iter().take(SAMPLE_SIZE) {
            tracing::info!(title = %entry.title, url = %entry.url, "sample entry");
        }

        Ok(index.into_entries())
    }

    async fn collect_page(
        &self,
        session: &dyn BrowserSession,
        page: u32,
        index: &mut DedupIndex,
    ) -> Result<(), ScraperError> {
        let url = self.options.page_url(page);
        tracing::info!(page, %url, "scraping listing page");

        let handle = session
            .new_page()
            .await
            .map_err(|e| ScraperError::ListPageLoad {
                page,
                source: Box::new(e),
            })?;
        let result = self.scan_page(handle.as_ref(), page, &url, index).await;
        handle.close().await;
        result
    }

    async fn scan_page(
        &self,
        handle: &dyn PageHandle,
        page: u32,
        url: &str,
        index: &mut DedupIndex,
    ) -> Result<(), ScraperError> {
        let load_error = |e: ScraperError| ScraperError::ListPageLoad {
            page,
            source: Box::new(e),
        };

        handle
            .navigate(url, self.options.nav_timeout)
            .await
            .map_err(load_error)?;
        tokio::time::sleep(self.options.settle).await;

        let mut links = handle
            .query_all(PRIMARY_LINK_SELECTOR)
            .await
            .map_err(load_error)?;
        if links.is_empty() {
            tracing::debug!(page, "primary link selector matched nothing; trying fallback");
            links = handle
                .query_all(FALLBACK_LINK_SELECTOR)
                .await
                .map_err(load_error)?;
        }
        tracing::info!(page, links = links.len(), "found item links");

        let before = index.len();
        for (position, link) in links.iter().enumerate() {
            match self.offer_candidate(link.as_ref(), index).await {
                Ok(Some((title, Admission::Accepted))) => {
                    tracing::debug!(page, %title, "accepted");
                }
                Ok(Some((title, Admission::DuplicateUrl))) => {
                    tracing::debug!(page, %title, "duplicate skipped (url)");
                }
                Ok(Some((title, Admission::DuplicateTitle))) => {
                    tracing::debug!(page, %title, "duplicate skipped (title)");
                }
                Ok(Some((_, Admission::EmptyKey)) | None) => {}
                Err(e) => {
                    tracing::debug!(page, position, error = %e, "error reading item link");
                }
            }
        }
        tracing::info!(page, added = index.len() - before, "listing page done");
        Ok(())
    }

    /// Reads one link and offers it to `index`. `Ok(None)` means the link was
    /// screened out before dedup (no title, a UI label, or no href).
    async fn offer_candidate(
        &self,
        link: &dyn ElementHandle,
        index: &mut DedupIndex,
    ) -> Result<Option<(String, Admission)>, ScraperError> {
        let Some(title_element) = first_within(link, TITLE_SELECTOR).await? else {
            return Ok(None);
        };
        let Some(title) = trimmed_inner_text(title_element.as_ref()).await? else {
            return Ok(None);
        };
        if is_non_title_label(&title) {
            return Ok(None);
        }
        let Some(href) = link.attribute("href").await?.filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };

        let url = normalize_url(&href, &self.options.origin);
        let admission = index.admit(&title, &url);
        Ok(Some((title, admission)))
    }
}

fn is_non_title_label(title: &str) -> bool {
    let lowered = title.to_lowercase();
    NON_TITLE_LABELS.iter().any(|label| *label == lowered)
}

#[cfg(test)]
#[path = "listing_test.rs"]
mod tests;
