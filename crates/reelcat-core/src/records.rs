use serde::{Deserialize, Serialize};

/// Column order the persistence layer writes metadata rows in. The `error`
/// side-channel column is appended after these.
pub const METADATA_COLUMNS: [&str; 12] = [
    "title",
    "url",
    "tomatometer_score",
    "audience_score",
    "genre",
    "rating",
    "duration",
    "release_date",
    "director",
    "original_language",
    "box_office",
    "distributor",
];

/// One catalog item discovered on a listing page.
///
/// `url` is already normalized; the raw title is kept as displayed so the
/// detail pass and the output carry the human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub title: String,
    pub url: String,
}

impl ListingEntry {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Structured metadata scraped from one detail page.
///
/// Field order matches [`METADATA_COLUMNS`] followed by `error`, so serializing
/// with `csv` or `serde_json` produces rows in the persisted column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: String,
    pub url: String,
    /// Critic score, always within `0..=100` when present.
    pub tomatometer_score: Option<u8>,
    /// Audience score, always within `0..=100` when present.
    pub audience_score: Option<u8>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    /// `"45m"`, `"1h 35m"` or the compact `"1h35m"` the page displays.
    pub duration: Option<String>,
    pub release_date: Option<String>,
    pub director: Option<String>,
    pub original_language: Option<String>,
    pub box_office: Option<String>,
    pub distributor: Option<String>,
    pub error: Option<String>,
}

impl MetadataRecord {
    /// An empty record for `url`/`title` with every metadata field unset.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// A minimal record carrying only the identity and the error text.
    pub fn failed(
        url: impl Into<String>,
        title: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(url, title)
        }
    }

    #[must_use]
    pub fn has_any_score(&self) -> bool {
        self.tomatometer_score.is_some() || self.audience_score.is_some()
    }
}

/// Result of extracting one listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExtractionOutcome {
    Success(MetadataRecord),
    Failure {
        url: String,
        title: String,
        error: String,
    },
}

impl ExtractionOutcome {
    pub fn failure(
        url: impl Into<String>,
        title: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::Failure {
            url: url.into(),
            title: title.into(),
            error: error.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Success(record) => &record.url,
            Self::Failure { url, .. } => url,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Success(record) => &record.title,
            Self::Failure { title, .. } => title,
        }
    }

    /// The successful record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&MetadataRecord> {
        match self {
            Self::Success(record) => Some(record),
            Self::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn tomatometer_score(&self) -> Option<u8> {
        self.record().and_then(|r| r.tomatometer_score)
    }

    /// Flattens the outcome into a persistable row. Failures become a record
    /// with only `title`, `url` and `error` populated.
    #[must_use]
    pub fn into_record(self) -> MetadataRecord {
        match self {
            Self::Success(record) => record,
            Self::Failure { url, title, error } => MetadataRecord::failed(url, title, error),
        }
    }
}

impl From<MetadataRecord> for ExtractionOutcome {
    /// A record carrying an error is the extractor's own failure record; it
    /// is reported as a failure, everything else as a success.
    fn from(record: MetadataRecord) -> Self {
        match record.error {
            Some(error) => Self::Failure {
                url: record.url,
                title: record.title,
                error,
            },
            None => Self::Success(record),
        }
    }
}
