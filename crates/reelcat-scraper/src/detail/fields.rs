//! Labeled rows of the detail page's info panel.

use std::sync::LazyLock;

use regex::Regex;
use reelcat_core::MetadataRecord;

use crate::error::ScraperError;
use crate::render::{first_within, trimmed_inner_text, ElementHandle, PageHandle};

pub const INFO_PANEL_SELECTOR: &str = "section.media-info";
pub const INFO_ITEM_SELECTOR: &str = r#"[data-qa="item"]"#;
pub const INFO_LABEL_SELECTOR: &str = r#"[data-qa="item-label"]"#;
pub const INFO_VALUE_SELECTOR: &str = r#"[data-qa="item-value"]"#;

static WIDE_RELEASE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*Wide$").expect("valid release suffix regex"));
static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid minutes regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoField {
    Genre,
    Rating,
    Runtime,
    ReleaseDate,
    Director,
    OriginalLanguage,
    BoxOffice,
    Distributor,
}

/// Label keywords in match order. A label maps to the first entry whose
/// keyword it contains.
const KEYWORDS: [(&str, InfoField); 8] = [
    ("genre", InfoField::Genre),
    ("rating", InfoField::Rating),
    ("runtime", InfoField::Runtime),
    ("release date", InfoField::ReleaseDate),
    ("director", InfoField::Director),
    ("original language", InfoField::OriginalLanguage),
    ("box office", InfoField::BoxOffice),
    ("distributor", InfoField::Distributor),
];

impl InfoField {
    /// Case-insensitive substring match of `label` against the keyword table.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let lowered = label.trim().to_lowercase();
        KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(*keyword))
            .map(|(_, field)| *field)
    }

    fn is_multi_value(self) -> bool {
        matches!(self, InfoField::Genre | InfoField::Director)
    }

    /// Stores the row's values on `record`. Multi-value fields are joined
    /// with `", "`; everything else keeps the first value only.
    pub fn apply(self, record: &mut MetadataRecord, values: &[String]) {
        let Some(first) = values.first() else {
            return;
        };
        let value = if self.is_multi_value() {
            values.join(", ")
        } else {
            first.clone()
        };

        match self {
            InfoField::Genre => record.genre = Some(value),
            InfoField::Rating => record.rating = Some(value),
            InfoField::Runtime => {
                record.duration = Some(value.chars().filter(|c| !c.is_whitespace()).collect());
            }
            InfoField::ReleaseDate => record.release_date = Some(clean_release_date(&value)),
            InfoField::Director => record.director = Some(value),
            InfoField::OriginalLanguage => record.original_language = Some(value),
            InfoField::BoxOffice => record.box_office = Some(value),
            InfoField::Distributor => record.distributor = Some(value),
        }
    }
}

/// Drops the trailing `", Wide"` release-type marker.
#[must_use]
pub fn clean_release_date(raw: &str) -> String {
    WIDE_RELEASE_SUFFIX.replace(raw, "").into_owned()
}

/// Rewrites a bare minute count as `"{m}m"` or `"{h}h {m}m"`. Values that
/// already carry an `h` or `m` unit, or contain no number, are returned as is.
#[must_use]
pub fn format_duration(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if lowered.contains('h') || lowered.contains('m') {
        return raw.to_owned();
    }
    let Some(minutes) = FIRST_NUMBER
        .find(raw)
        .and_then(|m| m.as_str().parse::<u64>().ok())
    else {
        return raw.to_owned();
    };
    if minutes < 60 {
        format!("{minutes}m")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Fills the info-panel fields of `record` from every matching panel, in
/// document order. A missing panel leaves every field unset; a row that
/// fails to read is skipped.
///
/// # Errors
///
/// Returns the query error if the panels themselves cannot be located.
pub async fn read_info_panel(
    page: &dyn PageHandle,
    record: &mut MetadataRecord,
) -> Result<(), ScraperError> {
    let panels = page.query_all(INFO_PANEL_SELECTOR).await?;
    if panels.is_empty() {
        tracing::debug!(url = %record.url, "no info panel on page");
        return Ok(());
    }

    for (panel_index, panel) in panels.iter().enumerate() {
        let items = match panel.query_all(INFO_ITEM_SELECTOR).await {
            Ok(items) => items,
            Err(e) => {
                tracing::debug!(url = %record.url, panel_index, error = %e, "skipping info panel");
                continue;
            }
        };
        for (position, item) in items.iter().enumerate() {
            match read_item(item.as_ref()).await {
                Ok(Some((field, values))) => field.apply(record, &values),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        url = %record.url,
                        panel_index,
                        position,
                        error = %e,
                        "skipping info row"
                    );
                }
            }
        }
    }
    Ok(())
}

async fn read_item(
    item: &dyn ElementHandle,
) -> Result<Option<(InfoField, Vec<String>)>, ScraperError> {
    let Some(label) = first_within(item, INFO_LABEL_SELECTOR).await? else {
        return Ok(None);
    };
    let Some(label) = trimmed_inner_text(label.as_ref()).await? else {
        return Ok(None);
    };
    let Some(field) = InfoField::from_label(&label) else {
        return Ok(None);
    };

    let mut values = Vec::new();
    for value in item.query_all(INFO_VALUE_SELECTOR).await? {
        if let Some(text) = trimmed_inner_text(value.as_ref()).await? {
            values.push(text);
        }
    }
    Ok(Some((field, values)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn labels_map_by_substring_in_table_order() {
        assert_eq!(InfoField::from_label("Genre"), Some(InfoField::Genre));
        assert_eq!(InfoField::from_label("  Rating: "), Some(InfoField::Rating));
        assert_eq!(
            InfoField::from_label("Release Date (Streaming)"),
            Some(InfoField::ReleaseDate)
        );
        assert_eq!(
            InfoField::from_label("BOX OFFICE (GROSS USA)"),
            Some(InfoField::BoxOffice)
        );
        assert_eq!(InfoField::from_label("Producer"), None);
    }

    #[test]
    fn multi_value_fields_join_and_single_value_fields_take_first() {
        let mut record = MetadataRecord::new("u", "t");
        InfoField::Genre.apply(&mut record, &values(&["Sci-Fi", "Action"]));
        InfoField::Director.apply(&mut record, &values(&["Lana Wachowski", "Lilly Wachowski"]));
        InfoField::Distributor.apply(&mut record, &values(&["Warner Bros.", "Village Roadshow"]));

        assert_eq!(record.genre.as_deref(), Some("Sci-Fi, Action"));
        assert_eq!(
            record.director.as_deref(),
            Some("Lana Wachowski, Lilly Wachowski")
        );
        assert_eq!(record.distributor.as_deref(), Some("Warner Bros."));
    }

    #[test]
    fn empty_values_leave_field_unset() {
        let mut record = MetadataRecord::new("u", "t");
        InfoField::Rating.apply(&mut record, &[]);
        assert!(record.rating.is_none());
    }

    #[test]
    fn runtime_whitespace_is_removed() {
        let mut record = MetadataRecord::new("u", "t");
        InfoField::Runtime.apply(&mut record, &values(&["1h 35m"]));
        assert_eq!(record.duration.as_deref(), Some("1h35m"));
    }

    #[test]
    fn release_date_drops_wide_suffix() {
        assert_eq!(clean_release_date("Mar 31, 1999, Wide"), "Mar 31, 1999");
        assert_eq!(clean_release_date("Mar 31, 1999 ,Wide"), "Mar 31, 1999");
        assert_eq!(clean_release_date("Mar 31, 1999, Limited"), "Mar 31, 1999, Limited");
    }

    #[test]
    fn format_duration_rewrites_bare_minutes() {
        assert_eq!(format_duration("45"), "45m");
        assert_eq!(format_duration("95"), "1h 35m");
        assert_eq!(format_duration("120 "), "2h 0m");
        assert_eq!(format_duration("60"), "1h 0m");
    }

    #[test]
    fn format_duration_keeps_values_with_units_or_without_numbers() {
        assert_eq!(format_duration("1h35m"), "1h35m");
        assert_eq!(format_duration("95 min"), "95 min");
        assert_eq!(format_duration("N/A"), "N/A");
        assert_eq!(format_duration(""), "");
    }
}
