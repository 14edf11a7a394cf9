pub mod batch;
pub mod chromium;
pub mod detail;
pub mod error;
pub mod listing;
pub mod normalize;
pub mod render;

#[cfg(test)]
mod testing;

pub use batch::{BatchCoordinator, BatchOptions, BatchSummary, ItemExtractor};
pub use chromium::{ChromiumOptions, ChromiumRenderer};
pub use detail::{DetailExtractor, DetailOptions};
pub use error::ScraperError;
pub use listing::{DedupIndex, ListCollector, ListingOptions};
pub use normalize::{normalize_title, normalize_url};
pub use render::{BrowserSession, ElementHandle, PageHandle, Renderer};
