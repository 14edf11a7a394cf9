use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("selector {selector} not found within {timeout_ms}ms")]
    SelectorNotFound { selector: String, timeout_ms: u64 },

    #[error("in-page script failed: {reason}")]
    Script { reason: String },

    #[error("rendering engine error: {0}")]
    Render(String),

    #[error("could not launch rendering engine: {0}")]
    BrowserLaunch(String),

    #[error("listing page {page} could not be loaded: {source}")]
    ListPageLoad {
        page: u32,
        #[source]
        source: Box<ScraperError>,
    },

    #[error("invalid site origin {origin}: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("extraction task for {url} failed: {reason}")]
    Task { url: String, reason: String },
}

impl ScraperError {
    /// Wraps a rendering-engine error from any backend.
    pub fn render(err: impl std::fmt::Display) -> Self {
        Self::Render(err.to_string())
    }
}
