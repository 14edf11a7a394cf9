//! Bounded-concurrency detail extraction over a list of entries, in paced
//! chunks with a strict barrier between them.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use reelcat_core::{AppConfig, ExtractionOutcome, ListingEntry, MetadataRecord};
use tokio::sync::Semaphore;

use crate::detail::DetailExtractor;
use crate::error::ScraperError;

/// Anything that can turn one listing entry into a metadata record.
#[async_trait]
pub trait ItemExtractor: Send + Sync {
    /// A returned record carrying `error` is the extractor's own failure
    /// record; an `Err` is an unexpected failure the coordinator isolates.
    async fn extract(&self, url: &str, title: &str) -> Result<MetadataRecord, ScraperError>;
}

#[async_trait]
impl ItemExtractor for DetailExtractor {
    async fn extract(&self, url: &str, title: &str) -> Result<MetadataRecord, ScraperError> {
        DetailExtractor::extract(self, url, title).await
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub chunk_size: usize,
    /// Pause between chunks; not applied after the last one.
    pub chunk_pause: Duration,
}

impl BatchOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_pause: Duration::from_millis(config.chunk_pause_ms),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            chunk_pause: Duration::from_secs(1),
        }
    }
}

pub struct BatchCoordinator<E> {
    extractor: E,
    options: BatchOptions,
}

impl<E: ItemExtractor> BatchCoordinator<E> {
    pub fn new(extractor: E, options: BatchOptions) -> Self {
        Self { extractor, options }
    }

    #[must_use]
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Extracts every entry and returns exactly one outcome per entry, in
    /// input order.
    ///
    /// At most `max_concurrent` extractions are in flight at once (a value of
    /// zero is treated as one). Chunk N+1 is not started until every
    /// extraction of chunk N has settled and the pacing pause has elapsed.
    /// Errors and panics from a single extraction become that entry's
    /// failure outcome.
    pub async fn run(
        &self,
        entries: &[ListingEntry],
        max_concurrent: usize,
    ) -> Vec<ExtractionOutcome> {
        let gate = Semaphore::new(max_concurrent.max(1));
        let chunk_size = self.options.chunk_size.max(1);
        let chunk_count = entries.len().div_ceil(chunk_size);
        let mut outcomes = Vec::with_capacity(entries.len());

        for (index, chunk) in entries.chunks(chunk_size).enumerate() {
            let chunk_number = index + 1;
            tracing::info!(
                chunk = chunk_number,
                chunks = chunk_count,
                items = chunk.len(),
                "processing chunk {chunk_number}/{chunk_count} ({} items)",
                chunk.len()
            );

            let tasks = chunk.iter().map(|entry| self.extract_gated(&gate, entry));
            outcomes.extend(join_all(tasks).await);

            if chunk_number < chunk_count {
                tokio::time::sleep(self.options.chunk_pause).await;
            }
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        tracing::info!(
            with_tomatometer = summary.tomatometer,
            total = summary.total,
            failures = summary.failures,
            "success rate: {}/{} ({:.1}%)",
            summary.tomatometer,
            summary.total,
            summary.tomatometer_rate()
        );
        outcomes
    }

    async fn extract_gated(&self, gate: &Semaphore, entry: &ListingEntry) -> ExtractionOutcome {
        let _permit = match gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return ExtractionOutcome::failure(
                    &entry.url,
                    &entry.title,
                    ScraperError::Task {
                        url: entry.url.clone(),
                        reason: e.to_string(),
                    }
                    .to_string(),
                );
            }
        };

        let attempt = AssertUnwindSafe(self.extractor.extract(&entry.url, &entry.title))
            .catch_unwind()
            .await;

        let error = match attempt {
            Ok(Ok(record)) => return ExtractionOutcome::from(record),
            Ok(Err(e)) => e,
            Err(panic) => ScraperError::Task {
                url: entry.url.clone(),
                reason: panic_message(panic.as_ref()),
            },
        };
        tracing::error!(
            title = %entry.title,
            url = %entry.url,
            error = %error,
            "extraction task failed"
        );
        ExtractionOutcome::failure(&entry.url, &entry.title, error.to_string())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_owned()
    }
}

/// Per-field completeness of a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub failures: usize,
    pub tomatometer: usize,
    pub audience: usize,
    pub genre: usize,
    pub rating: usize,
    pub duration: usize,
}

impl BatchSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[ExtractionOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            let Some(record) = outcome.record() else {
                summary.failures += 1;
                continue;
            };
            summary.tomatometer += usize::from(record.tomatometer_score.is_some());
            summary.audience += usize::from(record.audience_score.is_some());
            summary.genre += usize::from(record.genre.is_some());
            summary.rating += usize::from(record.rating.is_some());
            summary.duration += usize::from(record.duration.is_some());
        }
        summary
    }

    /// Share of outcomes with a critic score, as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tomatometer_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.tomatometer as f64 * 100.0 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::detail::DetailOptions;
    use crate::testing::{FakePage, FakeRenderer, FakeStats};

    fn entry(slug: &str) -> ListingEntry {
        ListingEntry::new(slug, format!("https://www.rottentomatoes.com/m/{slug}"))
    }

    fn options() -> BatchOptions {
        BatchOptions {
            chunk_size: 2,
            chunk_pause: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_becomes_failure_outcome_per_entry() {
        let renderer = FakeRenderer::new().launch_fails("chrome missing");
        let extractor = DetailExtractor::new(Arc::new(renderer), DetailOptions::default());
        let coordinator = BatchCoordinator::new(extractor, options());
        let entries = [entry("a"), entry("b"), entry("c")];

        let outcomes = coordinator.run(&entries, 2).await;

        assert_eq!(outcomes.len(), 3);
        for (outcome, entry) in outcomes.iter().zip(&entries) {
            assert!(!outcome.is_success());
            assert_eq!(outcome.url(), entry.url);
            let ExtractionOutcome::Failure { error, .. } = outcome else {
                unreachable!()
            };
            assert!(error.contains("chrome missing"), "unexpected error: {error}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_failure_record_becomes_failure_outcome() {
        let ok = entry("ok");
        let renderer = FakeRenderer::new()
            .page(&ok.url, FakePage::new())
            .page(&entry("down").url, FakePage::new().fails("net::ERR_FAILED"));
        let stats = Arc::clone(&renderer.stats);
        let extractor = DetailExtractor::new(Arc::new(renderer), DetailOptions::default());
        let coordinator = BatchCoordinator::new(extractor, options());

        let outcomes = coordinator.run(&[ok, entry("down")], 3).await;

        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert_eq!(FakeStats::count(&stats.sessions_closed), 2);
    }

    #[test]
    fn summary_counts_field_completeness() {
        let mut full = MetadataRecord::new("u1", "A");
        full.tomatometer_score = Some(90);
        full.audience_score = Some(80);
        full.genre = Some("Drama".to_owned());
        let mut partial = MetadataRecord::new("u2", "B");
        partial.duration = Some("1h 30m".to_owned());
        let outcomes = vec![
            ExtractionOutcome::Success(full),
            ExtractionOutcome::Success(partial),
            ExtractionOutcome::failure("u3", "C", "timeout"),
            ExtractionOutcome::failure("u4", "D", "timeout"),
        ];

        let summary = BatchSummary::from_outcomes(&outcomes);

        assert_eq!(
            summary,
            BatchSummary {
                total: 4,
                failures: 2,
                tomatometer: 1,
                audience: 1,
                genre: 1,
                rating: 0,
                duration: 1,
            }
        );
        assert!((summary.tomatometer_rate() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_summary_has_zero_rate() {
        assert!(BatchSummary::from_outcomes(&[]).tomatometer_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let from_str: Box<dyn std::any::Any + Send> = Box::new("bad index");
        let from_string: Box<dyn std::any::Any + Send> = Box::new(String::from("oops"));
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(from_str.as_ref()), "panicked: bad index");
        assert_eq!(panic_message(from_string.as_ref()), "panicked: oops");
        assert_eq!(panic_message(other.as_ref()), "panicked");
    }
}
