//! Seam between the extraction pipeline and the browser that renders pages.
//!
//! The pipeline only ever talks to these traits. [`crate::chromium`] provides
//! the production implementation; tests drive the same code through an
//! in-memory fake.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;

/// How often [`PageHandle::wait_for_selector`] re-queries the DOM.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Starts isolated rendering instances.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Launches a fresh rendering instance.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserLaunch`] if the engine cannot be started.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError>;
}

/// One running rendering instance. Pages opened from it share its cookies
/// and cache but nothing with other sessions.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens a blank page handle.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Render`] if the engine refuses a new target.
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, ScraperError>;

    /// Shuts the instance down. Failures are logged, never returned.
    async fn close(self: Box<Self>);
}

#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigates and waits for the document to load, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// [`ScraperError::NavigationTimeout`] when `timeout` elapses,
    /// [`ScraperError::Navigation`] for any other load failure.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScraperError>;

    /// All elements currently matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Render`] if the query cannot be executed.
    async fn query_all(&self, selector: &str)
        -> Result<Vec<Box<dyn ElementHandle>>, ScraperError>;

    /// Evaluates a JavaScript expression in the page and returns its JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Script`] if evaluation throws or the result is
    /// not JSON-serializable.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError>;

    /// Releases the page. Failures are logged, never returned.
    async fn close(self: Box<Self>);

    /// Waits until at least one element matches `selector` and returns the
    /// first one.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::SelectorNotFound`] if nothing matched within
    /// `timeout`, or the underlying query error.
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Box<dyn ElementHandle>, ScraperError> {
        let poll = async {
            loop {
                let matches = self.query_all(selector).await?;
                if let Some(found) = matches.into_iter().next() {
                    return Ok::<_, ScraperError>(found);
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(ScraperError::SelectorNotFound {
                selector: selector.to_owned(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Rendered text, as the user sees it.
    async fn inner_text(&self) -> Result<Option<String>, ScraperError>;

    /// Raw `textContent`, including text of hidden descendants.
    async fn text_content(&self) -> Result<Option<String>, ScraperError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError>;

    /// Descendants matching `selector`, in document order.
    async fn query_all(&self, selector: &str)
        -> Result<Vec<Box<dyn ElementHandle>>, ScraperError>;
}

/// First descendant of `element` matching `selector`, if any.
pub(crate) async fn first_within(
    element: &dyn ElementHandle,
    selector: &str,
) -> Result<Option<Box<dyn ElementHandle>>, ScraperError> {
    Ok(element.query_all(selector).await?.into_iter().next())
}

/// Trimmed inner text, with empty strings folded into `None`.
pub(crate) async fn trimmed_inner_text(
    element: &dyn ElementHandle,
) -> Result<Option<String>, ScraperError> {
    Ok(element
        .inner_text()
        .await?
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty()))
}
