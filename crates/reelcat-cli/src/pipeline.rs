//! `list` and `details` command handlers.
//!
//! Per-page and per-item failures are absorbed by the scraper; only a browser
//! that cannot start or an unreadable/unwritable file aborts a command.

use std::sync::Arc;

use reelcat_core::{AppConfig, ListingEntry, MetadataRecord};
use reelcat_scraper::{
    BatchCoordinator, BatchOptions, BatchSummary, ChromiumOptions, ChromiumRenderer,
    DetailExtractor, DetailOptions, ListCollector, ListingOptions, Renderer,
};

use crate::output;

const SAMPLE_SIZE: usize = 5;

fn renderer(config: &AppConfig) -> Arc<dyn Renderer> {
    Arc::new(ChromiumRenderer::new(ChromiumOptions::from_app_config(
        config,
    )))
}

/// Crawls the configured listing pages and writes the raw listing file.
///
/// # Errors
///
/// Returns an error if the site origin is invalid, the browser cannot be
/// launched, or the raw output cannot be written.
pub(crate) async fn run_list(config: &AppConfig) -> anyhow::Result<usize> {
    let options = ListingOptions::from_app_config(config)?;
    let collector = ListCollector::new(renderer(config), options);
    let entries = collector.collect(config.page_indices()).await?;

    output::write_listing(&config.raw_output, &entries)?;
    tracing::info!(
        count = entries.len(),
        path = %config.raw_output.display(),
        "saved unique listing entries"
    );
    Ok(entries.len())
}

/// Extracts metadata for the raw listing file and writes the clean file.
///
/// # Errors
///
/// Returns an error if the raw listing cannot be read or the clean output
/// cannot be written. Extraction failures are recorded per row instead.
pub(crate) async fn run_details(config: &AppConfig, limit: Option<usize>) -> anyhow::Result<()> {
    let entries = output::read_listing(&config.raw_output)?;
    tracing::info!(
        count = entries.len(),
        path = %config.raw_output.display(),
        "loaded listing entries"
    );
    let entries = select_entries(entries, limit);

    let extractor = DetailExtractor::new(renderer(config), DetailOptions::from_app_config(config));
    let coordinator = BatchCoordinator::new(extractor, BatchOptions::from_app_config(config));
    let outcomes = coordinator.run(&entries, config.max_concurrent).await;

    let summary = BatchSummary::from_outcomes(&outcomes);
    let records: Vec<MetadataRecord> = outcomes
        .into_iter()
        .map(reelcat_core::ExtractionOutcome::into_record)
        .collect();
    output::write_metadata(&config.clean_output, &records)?;

    tracing::info!(path = %config.clean_output.display(), "extraction results saved");
    log_completeness(&summary);
    for record in records.iter().take(SAMPLE_SIZE) {
        tracing::info!(
            title = %record.title,
            tomatometer = ?record.tomatometer_score,
            audience = ?record.audience_score,
            genre = record.genre.as_deref().unwrap_or("N/A"),
            "sample row"
        );
    }
    Ok(())
}

/// Applies `--limit`, keeping listing order.
fn select_entries(mut entries: Vec<ListingEntry>, limit: Option<usize>) -> Vec<ListingEntry> {
    if let Some(limit) = limit {
        entries.truncate(limit);
        tracing::info!(count = entries.len(), "limited run");
    } else {
        tracing::info!(count = entries.len(), "processing all entries");
    }
    entries
}

fn log_completeness(summary: &BatchSummary) {
    let total = summary.total;
    tracing::info!(
        failures = summary.failures,
        total,
        "data completeness: tomatometer {}/{total}, audience {}/{total}, genre {}/{total}, \
         rating {}/{total}, duration {}/{total}",
        summary.tomatometer,
        summary.audience,
        summary.genre,
        summary.rating,
        summary.duration,
    );
}
