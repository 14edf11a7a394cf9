//! Per-item detail extraction: scores through a strategy cascade, the info
//! panel fields, then post-processing and range sanitation.

pub mod fields;
pub mod scores;

use std::sync::Arc;
use std::time::Duration;

use reelcat_core::{AppConfig, MetadataRecord};

use crate::error::ScraperError;
use crate::render::{BrowserSession, PageHandle, Renderer};

pub use fields::{format_duration, InfoField};
pub use scores::{default_strategies, RawScores, ScoreKind, ScoreStrategy};

/// Container the score badges hydrate into.
pub const SCORECARD_SELECTOR: &str = "media-scorecard";

#[derive(Debug, Clone)]
pub struct DetailOptions {
    pub nav_timeout: Duration,
    /// Pause after navigation so client-side rendering can populate the page.
    pub settle: Duration,
    /// How long to wait for the scorecard container before reading scores.
    pub scorecard_wait: Duration,
    /// Per-selector wait used by the slotted score strategy.
    pub score_wait: Duration,
}

impl DetailOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            nav_timeout: Duration::from_secs(config.detail_nav_timeout_secs),
            settle: Duration::from_millis(config.detail_settle_ms),
            scorecard_wait: Duration::from_secs(config.scorecard_wait_secs),
            score_wait: Duration::from_secs(config.score_wait_secs),
        }
    }
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self {
            nav_timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
            scorecard_wait: Duration::from_secs(10),
            score_wait: Duration::from_secs(5),
        }
    }
}

/// Extracts one [`MetadataRecord`] per call, each in its own rendering
/// instance.
pub struct DetailExtractor {
    renderer: Arc<dyn Renderer>,
    options: DetailOptions,
    strategies: Vec<Box<dyn ScoreStrategy>>,
}

impl DetailExtractor {
    pub fn new(renderer: Arc<dyn Renderer>, options: DetailOptions) -> Self {
        let strategies = default_strategies(options.score_wait);
        Self {
            renderer,
            options,
            strategies,
        }
    }

    /// Replaces the score cascade.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn ScoreStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Extracts metadata for the detail page at `url`.
    ///
    /// Any failure after the rendering instance is up, including a failed
    /// navigation, produces a record with only `url`, `title` and `error`
    /// set. The instance and its page are released on every path.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserLaunch`] if no rendering instance can be
    /// started.
    pub async fn extract(&self, url: &str, title: &str) -> Result<MetadataRecord, ScraperError> {
        let session = self.renderer.launch().await?;
        let result = self.extract_in_session(session.as_ref(), url, title).await;
        session.close().await;

        Ok(result.unwrap_or_else(|e| {
            tracing::error!(%title, %url, error = %e, "metadata extraction failed");
            MetadataRecord::failed(url, title, e.to_string())
        }))
    }

    async fn extract_in_session(
        &self,
        session: &dyn BrowserSession,
        url: &str,
        title: &str,
    ) -> Result<MetadataRecord, ScraperError> {
        let page = session.new_page().await?;
        let result = self.extract_from_page(page.as_ref(), url, title).await;
        page.close().await;
        result
    }

    async fn extract_from_page(
        &self,
        page: &dyn PageHandle,
        url: &str,
        title: &str,
    ) -> Result<MetadataRecord, ScraperError> {
        tracing::debug!(%title, %url, "loading detail page");
        page.navigate(url, self.options.nav_timeout).await?;
        tokio::time::sleep(self.options.settle).await;

        if let Err(e) = page
            .wait_for_selector(SCORECARD_SELECTOR, self.options.scorecard_wait)
            .await
        {
            tracing::debug!(%title, error = %e, "scorecard container not found");
        }

        let raw = scores::resolve_scores(&self.strategies, page).await;

        let mut record = MetadataRecord::new(url, title);
        if let Err(e) = fields::read_info_panel(page, &mut record).await {
            tracing::debug!(%title, error = %e, "info panel unreadable");
        }

        record.tomatometer_score = scores::sanitize_score(raw.critic);
        record.audience_score = scores::sanitize_score(raw.audience);
        record.duration = record.duration.as_deref().map(format_duration);

        if record.has_any_score() {
            tracing::info!(
                %title,
                tomatometer = ?record.tomatometer_score,
                audience = ?record.audience_score,
                "scores extracted"
            );
        }
        Ok(record)
    }
}

#[cfg(test)]
#[path = "../detail_test.rs"]
mod tests;
