//! CSV persistence for the raw listing file and the clean metadata file.

use std::fs;
use std::path::Path;

use anyhow::Context;
use reelcat_core::{ListingEntry, MetadataRecord};
use serde::Serialize;

fn open_writer(path: &Path) -> anyhow::Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {} for writing", path.display()))
}

/// Writes `rows` with a header derived from the row type's field order.
fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    let mut writer = open_writer(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the `title,url` listing file.
pub(crate) fn write_listing(path: &Path, entries: &[ListingEntry]) -> anyhow::Result<()> {
    write_rows(path, entries)
}

/// Reads a listing file written by [`write_listing`]. Rows that fail to
/// parse are logged and skipped.
pub(crate) fn read_listing(path: &Path) -> anyhow::Result<Vec<ListingEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read listing file {}", path.display()))?;
    let mut entries = Vec::new();
    for (line, row) in reader.deserialize::<ListingEntry>().enumerate() {
        match row {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!(line = line + 2, error = %e, "skipping malformed listing row"),
        }
    }
    Ok(entries)
}

/// Writes metadata rows in the fixed column order with the trailing `error`
/// column. A file is written even when `records` is empty, with only a
/// header.
pub(crate) fn write_metadata(path: &Path, records: &[MetadataRecord]) -> anyhow::Result<()> {
    if records.is_empty() {
        return write_header_only(path);
    }
    write_rows(path, records)
}

fn write_header_only(path: &Path) -> anyhow::Result<()> {
    let mut writer = open_writer(path)?;
    let mut header: Vec<&str> = reelcat_core::METADATA_COLUMNS.to_vec();
    header.push("error");
    writer.write_record(&header)?;
    writer.flush()?;
    Ok(())
}
