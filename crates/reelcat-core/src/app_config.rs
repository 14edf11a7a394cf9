use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Runtime settings for a catalog run. Built by [`crate::load_app_config`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Listing URL prefix; the page index is appended verbatim.
    pub listing_url_template: String,
    /// Origin relative hrefs are resolved against, e.g. `https://www.rottentomatoes.com`.
    pub site_origin: String,
    /// First listing page index, inclusive.
    pub page_start: u32,
    /// Last listing page index, inclusive.
    pub page_end: u32,
    pub max_concurrent: usize,
    pub chunk_size: usize,
    pub chunk_pause_ms: u64,
    pub list_nav_timeout_secs: u64,
    pub detail_nav_timeout_secs: u64,
    pub scorecard_wait_secs: u64,
    pub score_wait_secs: u64,
    pub list_settle_ms: u64,
    pub detail_settle_ms: u64,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub raw_output: PathBuf,
    pub clean_output: PathBuf,
}

impl AppConfig {
    /// Listing page indices in crawl order.
    #[must_use]
    pub fn page_indices(&self) -> Vec<u32> {
        (self.page_start..=self.page_end).collect()
    }
}
